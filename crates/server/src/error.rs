// crates/server/src/error.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rtsp_timelapse_core::TimelapseError;
use serde::Serialize;
use thiserror::Error;

/// Structured JSON error response for API errors
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// API error types that map to HTTP status codes
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Timelapse(#[from] TimelapseError),

    #[error("Not implemented")]
    NotImplemented,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            ApiError::Timelapse(err) => match err {
                TimelapseError::Validation(msg) => {
                    tracing::warn!(message = %msg, "Bad request");
                    (
                        StatusCode::BAD_REQUEST,
                        ErrorResponse::with_details("Bad request", msg.clone()),
                    )
                }
                // Unknown ids are a client error, not a missing resource.
                TimelapseError::NotFound(id) => {
                    tracing::warn!(timelapse_id = %id, "Timelapse not found");
                    (
                        StatusCode::BAD_REQUEST,
                        ErrorResponse::with_details(
                            "Timelapse not found",
                            format!("Timelapse ID: {}", id),
                        ),
                    )
                }
                other => {
                    tracing::error!(error = %other, "Timelapse operation failed");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ErrorResponse::with_details("Internal server error", other.to_string()),
                    )
                }
            },
            ApiError::NotImplemented => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("Not implemented"),
            ),
        };

        (status, Json(error_response)).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
