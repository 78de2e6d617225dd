//! Storage registry and lifecycle for assetd.
//!
//! [`StoragesManager`] owns the live storages, the shared
//! [`Vault`](assetd_vault::Vault) and the
//! [`BuffersManager`](assetd_buffers::BuffersManager). It resolves the
//! `default` storage type, persists the registry atomically, and on startup
//! reattaches to every persisted storage except memory ones, which cannot
//! outlive the process.

pub mod config;
pub mod error;
mod factory;
pub mod manager;
pub mod registry;

pub use config::{ManagerConfig, DEFAULT_WORKSPACE};
pub use error::{ManagerError, ManagerResult};
pub use manager::StoragesManager;
pub use registry::StorageRecord;
