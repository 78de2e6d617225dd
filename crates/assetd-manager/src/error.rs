use assetd_buffers::BufferError;
use assetd_fs::FsError;
use assetd_storage::StorageError;
use assetd_types::StorageId;
use assetd_vault::VaultError;

/// Errors from storages manager operations.
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    /// No live storage has this id.
    #[error("storage not found: {0}")]
    StorageNotFound(StorageId),

    /// Backend failure, kind preserved.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Buffer failure, kind preserved.
    #[error(transparent)]
    Buffer(#[from] BufferError),

    /// Failure opening the shared vault.
    #[error(transparent)]
    Vault(#[from] VaultError),

    /// Failure persisting or loading the storage registry.
    #[error("registry error: {0}")]
    Fs(#[from] FsError),

    /// Rejected configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ManagerError {
    pub fn is_not_found(&self) -> bool {
        match self {
            ManagerError::StorageNotFound(_) => true,
            ManagerError::Storage(e) => e.is_not_found(),
            ManagerError::Buffer(e) => e.is_not_found(),
            ManagerError::Vault(e) => e.is_not_found(),
            _ => false,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, ManagerError::Storage(e) if e.is_conflict())
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(self, ManagerError::Storage(e) if e.is_invalid_input())
    }
}

/// Result alias for manager operations.
pub type ManagerResult<T> = Result<T, ManagerError>;
