//! Error types for the gateway
//!
//! Provides unified error handling using thiserror. Every handler failure is
//! converted into the JSON error envelope here.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::fetch::UpstreamError;

// == App Error Enum ==
/// Unified error type for the gateway.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or malformed client input
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Requested entity or date has no underlying data
    #[error("Not found: {0}")]
    NotFound(String),

    /// Upstream failed permanently (non-429 status, transport, decode)
    #[error("Upstream error{}: {message}", .status.map(|s| format!(" (status {})", s)).unwrap_or_default())]
    Upstream {
        status: Option<u16>,
        message: String,
    },

    /// Upstream kept rate limiting until the retry budget ran out
    #[error("Upstream rate limited (status 429) after {attempts} attempts: {message}")]
    RetriesExhausted { attempts: u32, message: String },

    /// Operation needs something the current runtime does not provide
    #[error("Unsupported in this environment: {0}")]
    EnvironmentUnsupported(String),

    /// Persisted cache tier failure
    #[error("Persisted cache error: {0}")]
    Persistence(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status this error is surfaced with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::EnvironmentUnsupported(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Upstream { .. }
            | AppError::RetriesExhausted { .. }
            | AppError::Persistence(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<UpstreamError> for AppError {
    fn from(err: UpstreamError) -> Self {
        AppError::Upstream {
            status: err.status(),
            message: err.to_string(),
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = Json(json!({
            "success": false,
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the gateway.
pub type Result<T> = std::result::Result<T, AppError>;
