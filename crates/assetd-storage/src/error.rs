use assetd_fs::FsError;
use assetd_vault::VaultError;

/// Errors from storage backend operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No asset is registered at the path.
    #[error("asset not found: {0}")]
    NotFound(String),

    /// An asset is already registered at the path.
    #[error("asset already exists: {0}")]
    AlreadyExists(String),

    /// The path cannot name an asset inside the storage root.
    #[error("invalid asset path: {0:?}")]
    InvalidPath(String),

    /// I/O error while writing, reading or enumerating assets.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure persisting or loading backend metadata.
    #[error("filesystem error: {0}")]
    Fs(#[from] FsError),

    /// Failure in the shared object vault.
    #[error("vault error: {0}")]
    Vault(#[from] VaultError),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        match self {
            StorageError::NotFound(_) => true,
            StorageError::Vault(e) => e.is_not_found(),
            _ => false,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StorageError::AlreadyExists(_))
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(self, StorageError::InvalidPath(_))
    }
}

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
