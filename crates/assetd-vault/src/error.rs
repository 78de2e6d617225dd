use assetd_fs::FsError;
use assetd_types::ObjectId;

/// Errors from vault operations.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// The object is not physically present in the vault.
    #[error("vault object not found: {0}")]
    ObjectNotFound(ObjectId),

    /// I/O error while adopting or opening an object.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure persisting or loading the reference database.
    #[error("filesystem error: {0}")]
    Fs(#[from] FsError),
}

impl VaultError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, VaultError::ObjectNotFound(_))
    }
}

/// Result alias for vault operations.
pub type VaultResult<T> = Result<T, VaultError>;
