//! Tracker error types with HTTP status code mapping.
//!
//! [`TrackerError`] is the central error type for the service. Each variant
//! maps to a specific HTTP status code and structured JSON error response.
//! Only the analytics and catalog paths surface store errors to callers;
//! the ingest and reconcile paths log and absorb them.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::AdId;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 1002,
///     "message": "invalid timeframe: 2h",
///     "details": "use one of: 15m, 30m, 1h, 6h, 12h, 24h, 7d, 30d"
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Service error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category   | HTTP Status                 |
/// |-----------|------------|-----------------------------|
/// | 1000–1999 | Validation | 400 Bad Request             |
/// | 2000–2999 | Not Found  | 404 Not Found               |
/// | 3000–3999 | Server     | 500 / 503                   |
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Analytics window token outside the supported set.
    #[error("invalid timeframe: {0}")]
    InvalidTimeWindow(String),

    /// No ad with the given id exists.
    #[error("ad not found: {0}")]
    AdNotFound(AdId),

    /// The ingest queue is at capacity; the click was not accepted.
    #[error("click queue is full, retry later")]
    IngestQueueFull,

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TrackerError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::InvalidTimeWindow(_) => 1002,
            Self::AdNotFound(_) => 2001,
            Self::Internal(_) => 3000,
            Self::PersistenceError(_) => 3001,
            Self::IngestQueueFull => 3002,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::InvalidTimeWindow(_) => StatusCode::BAD_REQUEST,
            Self::AdNotFound(_) => StatusCode::NOT_FOUND,
            Self::IngestQueueFull => StatusCode::SERVICE_UNAVAILABLE,
            Self::PersistenceError(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(&self) -> Option<String> {
        match self {
            Self::InvalidTimeWindow(_) => {
                Some("use one of: 15m, 30m, 1h, 6h, 12h, 24h, 7d, 30d".to_string())
            }
            _ => None,
        }
    }
}

impl IntoResponse for TrackerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: self.details(),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
