//! Mapping of storage failures onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use filedrop_files::FilesError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// JSON body returned for every failed request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    /// Stable error kind, e.g. `not_found` or `unsupported_type`
    pub error: String,
    /// Human-readable description
    pub message: String,
}

#[derive(Debug)]
pub enum ApiError {
    /// Failure reported by the storage engine
    Files(FilesError),
    /// Malformed request outside the engine's concern (bad multipart, missing field)
    BadRequest(String),
    /// Request body rejected by the transport with its own status
    Transport(StatusCode, String),
    /// Failure in the adapter itself, such as a panicked blocking task
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Files(FilesError::PayloadTooLarge(_)) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Files(FilesError::InvalidPath(_)) => StatusCode::BAD_REQUEST,
            ApiError::Files(FilesError::UnsupportedType(_)) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::Files(FilesError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Files(FilesError::StorageIo(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Transport(status, _) => *status,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            ApiError::Files(e) => e.kind(),
            ApiError::Transport(StatusCode::PAYLOAD_TOO_LARGE, _) => "payload_too_large",
            ApiError::BadRequest(_) | ApiError::Transport(..) => "bad_request",
            ApiError::Internal(_) => "internal",
        }
    }

    /// Message safe to show the client. Storage I/O details stay in the logs.
    pub fn message(&self) -> String {
        match self {
            ApiError::Files(FilesError::StorageIo(_)) | ApiError::Internal(_) => {
                "Internal error".into()
            }
            ApiError::Files(e) => e.to_string(),
            ApiError::BadRequest(msg) | ApiError::Transport(_, msg) => msg.clone(),
        }
    }

    pub(crate) fn to_body(&self) -> ErrorRes {
        ErrorRes {
            error: self.kind().into(),
            message: self.message(),
        }
    }
}

impl From<FilesError> for ApiError {
    fn from(e: FilesError) -> Self {
        ApiError::Files(e)
    }
}

impl From<axum::extract::multipart::MultipartError> for ApiError {
    fn from(e: axum::extract::multipart::MultipartError) -> Self {
        ApiError::Transport(e.status(), e.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self {
            ApiError::Files(FilesError::StorageIo(e)) => tracing::error!("Storage error: {}", e),
            ApiError::Internal(msg) => tracing::error!("Internal error: {}", msg),
            other => tracing::debug!("Request rejected ({}): {}", status, other.message()),
        }

        (status, Json(self.to_body())).into_response()
    }
}
