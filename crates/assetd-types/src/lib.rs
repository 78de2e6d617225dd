//! Foundation types for assetd.
//!
//! This crate provides the identifiers and small value types shared by every
//! other assetd crate: the storage registry, the storage backends, the vault
//! and the request boundary.
//!
//! # Key Types
//!
//! - [`StorageId`] -- UUID-based identifier of one storage instance
//! - [`StorageType`] -- Backend variant (memory, plain filesystem, hashed filesystem)
//! - [`AssetOpts`] -- Per-asset options (permission bits)
//! - [`AssetEntry`] -- One row of a storage listing
//! - [`ObjectId`] -- Content-addressed identifier (SHA-256)

pub mod asset;
pub mod error;
pub mod object;
pub mod storage;

pub use asset::{AssetEntry, AssetOpts, DEFAULT_ASSET_MODE};
pub use error::TypeError;
pub use object::ObjectId;
pub use storage::{StorageId, StorageType};
