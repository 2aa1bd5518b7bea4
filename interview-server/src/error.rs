//! Error handling for the axum server.
//! Maps `InterviewError` to HTTP status codes and JSON error bodies.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use interview_core::InterviewError;
use serde_json::json;

/// Wrapper to convert `InterviewError` into an axum response.
#[derive(Debug)]
pub struct AppError(pub InterviewError);

impl From<InterviewError> for AppError {
    fn from(e: InterviewError) -> Self {
        Self(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let body = match &self.0 {
            // per-field validation details
            InterviewError::InvalidInput(errors) => json!({ "errors": errors }),
            // misconfiguration stays opaque to the client
            InterviewError::Misconfigured(detail) => {
                tracing::error!(%detail, "interview misconfiguration");
                json!({"error": "internal server error"})
            }
            InterviewError::Undefined(locator) => {
                tracing::error!(%locator, "undefined variable escaped the runner");
                json!({"error": "internal server error"})
            }
            other => {
                tracing::debug!(error = %other, "request rejected");
                json!({"error": other.to_string()})
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Shorthand for a 400 with a message.
pub fn bad_request(msg: impl Into<String>) -> AppError {
    AppError(InterviewError::InvalidState(msg.into()))
}
