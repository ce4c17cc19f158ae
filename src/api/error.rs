//! Shared error handling for the gate and the session endpoints.
//!
//! Expected failures render flat `{"error": "..."}` bodies with their local
//! status code; only unexpected internal errors render the uniform envelope
//! `{"error": {"message", "code", "requestId"}}`. Store and crypto detail
//! stays in the logs, never in a response body.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use crate::request_id::RequestId;

/// Extension trait for concise error mapping on Results.
pub trait ResultExt<T> {
    /// Log a store failure and convert it to a generic internal error.
    fn store_err(self, context: &str, request_id: Option<&RequestId>) -> Result<T, ApiError>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    fn store_err(self, context: &str, request_id: Option<&RequestId>) -> Result<T, ApiError> {
        self.map_err(|e| {
            error!("{}: {}", context, e);
            ApiError::internal("Internal Server Error", request_id)
        })
    }
}

/// API error type with automatic response conversion.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    RateLimited { retry_after_secs: u64 },
    Internal { message: String, request_id: Option<String> },
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn rate_limited(retry_after_secs: u64) -> Self {
        Self::RateLimited { retry_after_secs }
    }

    pub fn internal(msg: impl Into<String>, request_id: Option<&RequestId>) -> Self {
        Self::Internal {
            message: msg.into(),
            request_id: request_id.map(|id| id.0.clone()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response()
            }
            ApiError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, Json(json!({ "error": msg }))).into_response()
            }
            ApiError::Forbidden(msg) => {
                (StatusCode::FORBIDDEN, Json(json!({ "error": msg }))).into_response()
            }
            ApiError::RateLimited { retry_after_secs } => (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({
                    "error": "Too many requests",
                    "retryAfter": retry_after_secs,
                })),
            )
                .into_response(),
            ApiError::Internal { message, request_id } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": {
                        "message": message,
                        "code": "INTERNAL_ERROR",
                        "requestId": request_id,
                    }
                })),
            )
                .into_response(),
        }
    }
}
