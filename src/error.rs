//! Errors that reach the HTTP boundary.
//!
//! `GovernanceError` is what the request-governance layer returns to callers.
//! `AppError` is the boundary signal of the data-access collaborators; the
//! governance layer never produces or inspects it.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GovernanceError {
    #[error("rate limit of {limit} requests exceeded, retry in {retry_after_secs}s")]
    RateLimitExceeded { limit: u64, retry_after_secs: u64 },

    /// Fail-closed rejection while the counter store is down. The store's own
    /// error never reaches the caller.
    #[error("rate limiting temporarily unavailable")]
    CounterStoreUnavailable,
}

impl IntoResponse for GovernanceError {
    fn into_response(self) -> Response {
        match self {
            GovernanceError::RateLimitExceeded {
                limit,
                retry_after_secs,
            } => {
                let body = json!({
                    "detail": "Rate limit exceeded",
                    "limit": limit,
                    "retry_after": retry_after_secs,
                });
                let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
                response
            }
            GovernanceError::CounterStoreUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "detail": "Rate limiting temporarily unavailable" })),
            )
                .into_response(),
        }
    }
}

/// Errors raised by the persistence-facing parts of the application.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    #[error("{0} not found")]
    InstanceNotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::InstanceNotFound(_) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "message": self.to_string() })),
            )
                .into_response(),
        }
    }
}
