//! Content-addressed object vault for assetd.
//!
//! The vault keeps at most one physical copy of every distinct payload,
//! shared by all hashed-filesystem storages. Objects are identified by the
//! SHA-256 of their bytes and laid out on disk under a fixed-depth hex
//! fan-out (`ab/cd/ef01...` for depth 2).
//!
//! # Components
//!
//! - [`Vault`] -- object adoption, open, unreference and deferred deletion
//! - [`RefsDb`] -- persistent object -> `[(storage, path)]` reference lists
//! - [`OpenTracker`] -- per-object open-reader counts with one-shot
//!   "fully closed" callbacks
//! - [`ChecksumWriter`] -- computes an [`ObjectId`](assetd_types::ObjectId)
//!   while streaming bytes to a temp file
//!
//! # Design Rules
//!
//! 1. An object's bytes are deleted only when its reference count is zero
//!    AND no reader holds it open.
//! 2. Every vault decision point (adopt, open, close, unreference) runs under
//!    one vault-wide lock.
//! 3. The reference database is rewritten atomically after every mutation
//!    and rolled back in memory if that write fails.

pub mod checksum;
pub mod error;
pub mod opened;
pub mod refs;
pub mod vault;

pub use checksum::ChecksumWriter;
pub use error::{VaultError, VaultResult};
pub use opened::{CloseCallback, OpenTracker};
pub use refs::{Ref, RefAdd, RefsDb};
pub use vault::{Vault, VaultAsset, VaultConfig, VaultFile, DEFAULT_VAULT_DEPTH};
