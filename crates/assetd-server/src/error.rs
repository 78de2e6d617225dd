use assetd_buffers::BufferError;
use assetd_manager::ManagerError;
use assetd_storage::StorageError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Errors starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("storage manager error: {0}")]
    Manager(#[from] ManagerError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

/// Error returned by request handlers, already mapped to a status.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<ManagerError> for ApiError {
    fn from(e: ManagerError) -> Self {
        let status = if e.is_not_found() {
            StatusCode::NOT_FOUND
        } else if e.is_conflict() {
            StatusCode::CONFLICT
        } else if e.is_invalid_input() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self::new(status, e.to_string())
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        ManagerError::from(e).into()
    }
}

impl From<BufferError> for ApiError {
    fn from(e: BufferError) -> Self {
        ManagerError::from(e).into()
    }
}

impl From<std::io::Error> for ApiError {
    fn from(e: std::io::Error) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, format!("worker task failed: {e}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, error = %self.message, "request failed");
        } else {
            tracing::debug!(status = %self.status, error = %self.message, "request rejected");
        }
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetd_types::StorageId;

    #[test]
    fn kinds_map_to_statuses() {
        let not_found: ApiError = ManagerError::StorageNotFound(StorageId::new("x")).into();
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let missing_asset: ApiError = StorageError::NotFound("a".into()).into();
        assert_eq!(missing_asset.status(), StatusCode::NOT_FOUND);

        let conflict: ApiError = StorageError::AlreadyExists("a".into()).into();
        assert_eq!(conflict.status(), StatusCode::CONFLICT);

        let invalid: ApiError = StorageError::InvalidPath("../a".into()).into();
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

        let buffer: ApiError = BufferError::NotFound("b".into()).into();
        assert_eq!(buffer.status(), StatusCode::NOT_FOUND);

        let io: ApiError = StorageError::Io(std::io::Error::other("disk")).into();
        assert_eq!(io.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
