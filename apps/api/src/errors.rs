use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// Failure category of a resume-processing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    Validation,
    Extraction,
    Model,
    Render,
    Internal,
}

/// Pipeline-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, PipelineError>`.
///
/// The message is user-visible and lands in the `error` field of the JSON envelope.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    Validation(String),

    /// Request body exceeded the router's upload limit.
    #[error("File too large (max 16 MiB)")]
    TooLarge,

    #[error("{0}")]
    Extraction(String),

    #[error("{0}")]
    Model(String),

    #[error("{0}")]
    Render(String),

    #[error("{0}")]
    Internal(String),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Validation(_) | PipelineError::TooLarge => ErrorKind::Validation,
            PipelineError::Extraction(_) => ErrorKind::Extraction,
            PipelineError::Model(_) => ErrorKind::Model,
            PipelineError::Render(_) => ErrorKind::Render,
            PipelineError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            PipelineError::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            _ if self.kind() == ErrorKind::Validation => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Keeps the body-limit case apart from other malformed uploads.
    fn from_multipart_status(status: StatusCode, message: String) -> Self {
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            PipelineError::TooLarge
        } else {
            PipelineError::Validation(message)
        }
    }
}

impl From<MultipartError> for PipelineError {
    fn from(e: MultipartError) -> Self {
        PipelineError::from_multipart_status(e.status(), e.body_text())
    }
}

impl From<MultipartRejection> for PipelineError {
    fn from(e: MultipartRejection) -> Self {
        PipelineError::from_multipart_status(e.status(), e.body_text())
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self.kind() {
            ErrorKind::Validation => tracing::warn!("Rejected request: {self}"),
            kind => tracing::error!("{kind:?} error: {self}"),
        }
        failure_response(status, &self.to_string())
    }
}

/// Builds the `{success: false, error: <message>}` envelope shared by every
/// failure path, including auth and visitor-counter errors.
pub fn failure_response(status: StatusCode, message: &str) -> Response {
    let body = Json(json!({
        "success": false,
        "error": message,
    }));

    (status, body).into_response()
}
