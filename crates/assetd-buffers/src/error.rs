use assetd_fs::FsError;

/// Errors from buffer operations.
#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    /// The id is malformed or names no staged buffer.
    #[error("buffer not found: {0}")]
    NotFound(String),

    /// I/O error on a buffer file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure preparing the buffers root.
    #[error("filesystem error: {0}")]
    Fs(#[from] FsError),
}

impl BufferError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, BufferError::NotFound(_))
    }
}

/// Result alias for buffer operations.
pub type BufferResult<T> = Result<T, BufferError>;
