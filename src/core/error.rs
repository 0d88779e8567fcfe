use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Storage errors
// ---------------------------------------------------------------------------

/// Errors originating from the video slot store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid slot configuration: {reason}")]
    InvalidSlot { reason: String },

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Upload errors
// ---------------------------------------------------------------------------

/// Errors originating from the upload handler.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("no file uploaded: expected multipart field '{field}'")]
    MissingField { field: String },

    #[error("unsupported media type '{media_type}': only {accepted}* files are accepted")]
    UnsupportedMediaType { media_type: String, accepted: String },

    #[error("upload too large: exceeds limit of {max_bytes} bytes")]
    UploadTooLarge { max_bytes: u64 },

    #[error("malformed multipart body: {reason}")]
    Multipart { reason: String },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl UploadError {
    /// Map an UploadError to its HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            UploadError::MissingField { .. }
            | UploadError::UnsupportedMediaType { .. }
            | UploadError::Multipart { .. } => StatusCode::BAD_REQUEST,
            UploadError::UploadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            UploadError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Return the error code string for JSON responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            UploadError::MissingField { .. } => "no_file",
            UploadError::UnsupportedMediaType { .. } => "invalid_media_type",
            UploadError::UploadTooLarge { .. } => "payload_too_large",
            UploadError::Multipart { .. } => "invalid_multipart",
            UploadError::Storage(_) => "storage_error",
        }
    }

    /// Client-facing message. Storage failures are reported generically.
    fn public_message(&self) -> String {
        match self {
            UploadError::MissingField { .. } => "No file uploaded".to_string(),
            UploadError::Storage(_) => "Failed to store uploaded video.".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        if let UploadError::Storage(ref e) = self {
            tracing::error!(error = %e, "upload failed with storage error");
        }
        error_json(self.status_code(), self.error_code(), &self.public_message())
    }
}

// ---------------------------------------------------------------------------
// Delivery errors
// ---------------------------------------------------------------------------

/// Errors originating from the retrieval handler.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("no video has been uploaded yet")]
    NotFound,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl DeliveryError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DeliveryError::NotFound => StatusCode::NOT_FOUND,
            DeliveryError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            DeliveryError::NotFound => "not_found",
            DeliveryError::Storage(_) => "storage_error",
        }
    }
}

impl IntoResponse for DeliveryError {
    fn into_response(self) -> Response {
        let message = match &self {
            DeliveryError::NotFound => "No video has been uploaded yet".to_string(),
            DeliveryError::Storage(e) => {
                tracing::error!(error = %e, "failed to read stored video");
                "Failed to read stored video.".to_string()
            }
        };
        error_json(self.status_code(), self.error_code(), &message)
    }
}

// ---------------------------------------------------------------------------
// Error response body
// ---------------------------------------------------------------------------

/// JSON body shared by every client-facing error.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

pub fn error_json(status: StatusCode, error: &str, message: &str) -> Response {
    let body = ErrorResponse {
        error: error.to_string(),
        message: message.to_string(),
    };
    (status, Json(body)).into_response()
}
