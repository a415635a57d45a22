//! Error types for vellum-mq
//!
//! `PipelineError` is what the moderation pipeline returns; `ApiError` is what
//! HTTP handlers turn into a JSON response.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Moderation pipeline error
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Operation references an unknown submission or report
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Malformed verdict, out-of-range value or missing required field
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Record store unreachable or rejected the write
    #[error("Record store error: {0}")]
    Store(#[from] vellum_common::Error),
}

impl PipelineError {
    pub fn submission_not_found(id: &str) -> Self {
        PipelineError::NotFound {
            kind: "Submission",
            id: id.to_string(),
        }
    }

    pub fn report_not_found(id: &str) -> Self {
        PipelineError::NotFound {
            kind: "Report",
            id: id.to_string(),
        }
    }
}

impl From<sqlx::Error> for PipelineError {
    fn from(err: sqlx::Error) -> Self {
        PipelineError::Store(vellum_common::Error::Database(err))
    }
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            PipelineError::Validation(msg) => ApiError::BadRequest(msg),
            PipelineError::Store(vellum_common::Error::NotFound(msg)) => ApiError::NotFound(msg),
            PipelineError::Store(vellum_common::Error::InvalidInput(msg)) => {
                ApiError::BadRequest(msg)
            }
            PipelineError::Store(inner) => ApiError::Internal(inner.to_string()),
        }
    }
}

impl From<vellum_common::Error> for ApiError {
    fn from(err: vellum_common::Error) -> Self {
        PipelineError::Store(err).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg)
            }
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_404() {
        let api: ApiError = PipelineError::submission_not_found("42").into();
        assert!(matches!(api, ApiError::NotFound(ref msg) if msg == "Submission not found: 42"));
        assert_eq!(api.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_validation_maps_to_400() {
        let api: ApiError = PipelineError::Validation("bad verdict".to_string()).into();
        assert_eq!(api.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_store_failure_maps_to_500() {
        let api: ApiError =
            PipelineError::Store(vellum_common::Error::Internal("disk full".to_string())).into();
        assert_eq!(api.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
