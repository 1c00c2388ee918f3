//! Error handling and HTTP error conversion
//!
//! Handlers return [`ApiError`], which carries the HTTP status to answer with and the
//! underlying error. The response body is always an [`ErrorResponse`].

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Standard error response for all API errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Error details
    pub error: ErrorDetails,
}

/// Error details structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetails {
    /// Machine-readable error code
    pub code: String,

    /// Human-readable error message
    pub message: String,
}

/// Axum response wrapper for API errors
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(headers: HeaderMap) -> Result<StatusCode, ApiError> {
///     let event = headers.get("x-github-event").ok_or_else(|| ApiError::bad_request("missing event"))?;
///     Ok(StatusCode::ACCEPTED)
/// }
/// ```
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: anyhow::Error,
}

impl ApiError {
    /// Create a new API error with an explicit status
    pub fn new(status: StatusCode, err: impl Into<anyhow::Error>) -> Self {
        Self {
            status,
            error: err.into(),
        }
    }

    /// The request could not be understood
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, anyhow::anyhow!(message.into()))
    }

    /// The request is not authentic
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, anyhow::anyhow!(message.into()))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        log_error(&self.error, self.status);

        let (code, message) = match self.status {
            StatusCode::BAD_REQUEST => ("ValidationError", self.error.to_string()),
            StatusCode::UNAUTHORIZED => ("AuthenticationError", self.error.to_string()),
            // Internal details stay in the logs.
            _ => (
                "InternalError",
                "An internal error occurred".to_string(),
            ),
        };

        let body = ErrorResponse {
            error: ErrorDetails {
                code: code.to_string(),
                message,
            },
        };

        (self.status, Json(body)).into_response()
    }
}

/// Log error with appropriate level based on HTTP status
fn log_error(error: &anyhow::Error, status: StatusCode) {
    if status.is_server_error() {
        tracing::error!(status = %status, error = ?error, "API error");
    } else {
        tracing::warn!(status = %status, error = %error, "API error");
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;
