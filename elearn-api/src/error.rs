//! HTTP error mapping
//!
//! Every failure leaves the service as
//! `{"success": false, "message": ..., "error": {"code": ..., "details": [...]}}`.
//! Server-side failures are logged and replaced by a generic message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use elearn_common::Error;
use serde_json::json;
use thiserror::Error as ThisError;
use tracing::error;

/// API error type
#[derive(Debug, ThisError)]
pub enum ApiError {
    /// Missing or unrecognised caller identity (401)
    #[error("Authentication required: {0}")]
    Unauthorized(String),

    /// Caller's role does not allow the operation (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Malformed request that never reached the domain layer (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// elearn-common error
    #[error(transparent)]
    Common(#[from] Error),
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Common(Error::from(err))
    }
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Common(err) => match err {
                Error::SequenceGap { .. } => (StatusCode::BAD_REQUEST, "SEQUENCE_GAP"),
                Error::SequenceRange { .. } => (StatusCode::BAD_REQUEST, "SEQUENCE_RANGE"),
                Error::PublishPrecondition(_) => {
                    (StatusCode::BAD_REQUEST, "PUBLISH_PRECONDITION")
                }
                Error::DependencyBlock { .. } => (StatusCode::CONFLICT, "DEPENDENCY_BLOCK"),
                Error::UniquenessConflict(_) => (StatusCode::CONFLICT, "UNIQUENESS_CONFLICT"),
                Error::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                Error::InvalidInput(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
                Error::Database(_) | Error::Io(_) | Error::Config(_) | Error::Internal(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();

        let (message, details) = match &self {
            ApiError::Common(err) if !err.is_client_error() => {
                error!("Request failed: {}", err);
                ("Internal server error".to_string(), Vec::new())
            }
            ApiError::Common(err) => (err.to_string(), err.details()),
            other => (other.to_string(), Vec::new()),
        };

        let body = Json(json!({
            "success": false,
            "message": message,
            "error": {
                "code": code,
                "details": details,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
