//! Storage handle and asset backends for assetd.
//!
//! A [`Storage`] is a handle binding a [`StorageId`](assetd_types::StorageId)
//! to one backend implementing [`StorageOps`]:
//!
//! - [`MemoryStorage`] -- in-process map, dropped on restart
//! - [`PlainStorage`] -- one file per asset under the storage root
//! - [`HashedStorage`] -- path index over the shared content-addressed vault
//!
//! Every backend writes atomically: an asset is either fully present or absent.

pub mod error;
pub mod hashed;
pub mod memory;
pub mod plain;
pub mod storage;
pub mod traits;

pub use error::{StorageError, StorageResult};
pub use hashed::{AssetRecord, HashedStorage, HashedStorageConfig};
pub use memory::MemoryStorage;
pub use plain::PlainStorage;
pub use storage::Storage;
pub use traits::{AssetReader, StorageOps};
