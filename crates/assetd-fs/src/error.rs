use std::io;
use std::path::PathBuf;

/// Errors from filesystem helper operations.
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    /// I/O error from the underlying filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Directory creation failed.
    #[error("directory creation error: {source}. Path: {path}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// JSON encoding or decoding failure.
    #[error("serialization error in {path}: {reason}")]
    Serialization { path: PathBuf, reason: String },
}

/// Result alias for filesystem helper operations.
pub type FsResult<T> = Result<T, FsError>;
