//! Request context and correlation IDs.
//!
//! # Responsibilities
//! - Reuse the caller's `X-Request-ID` or generate a UUID v4
//! - Build the per-request `RequestContext` before any other middleware
//! - Echo the correlation ID on every response, rejections included
//! - Open the `request` span that correlates all downstream logs
//!
//! # Design Decisions
//! - Correlation is the outermost governance stage and never fails a request
//! - Inbound IDs are reused verbatim when they are not blank; the echo
//!   carries the caller's exact header bytes

use axum::{
    body::Body,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use std::time::{Instant, SystemTime};
use tracing::Instrument;
use uuid::Uuid;

use crate::observability::metrics;
use crate::security::identity::ClientIdentity;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Per-request state, owned by a single request's execution.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub correlation_id: String,
    /// `Unknown` until the identity stage runs.
    pub client_identity: ClientIdentity,
    pub received_at: SystemTime,
}

impl RequestContext {
    pub fn new(correlation_id: String) -> Self {
        Self {
            correlation_id,
            client_identity: ClientIdentity::Unknown,
            received_at: SystemTime::now(),
        }
    }
}

/// Handlers take `RequestContext` as an extractor to log with the
/// correlation ID.
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

/// Correlation ID for one request: text form for logs and handlers, header
/// form for the echo.
#[derive(Debug, Clone)]
pub struct CorrelationId {
    pub id: String,
    pub header: Option<HeaderValue>,
}

/// Caller-supplied correlation ID, if not blank.
fn inbound_correlation_id(headers: &HeaderMap) -> Option<&HeaderValue> {
    headers
        .get(X_REQUEST_ID)
        .filter(|value| !value.as_bytes().iter().all(u8::is_ascii_whitespace))
}

pub fn correlation_id_for(headers: &HeaderMap) -> CorrelationId {
    match inbound_correlation_id(headers) {
        Some(value) => CorrelationId {
            id: String::from_utf8_lossy(value.as_bytes()).into_owned(),
            header: Some(value.clone()),
        },
        None => {
            let id = Uuid::new_v4().to_string();
            CorrelationId {
                header: HeaderValue::from_str(&id).ok(),
                id,
            }
        }
    }
}

/// First pipeline stage.
pub async fn request_context_middleware(mut request: Request<Body>, next: Next) -> Response {
    let started = Instant::now();
    let CorrelationId { id: correlation_id, header } = correlation_id_for(request.headers());
    let method = request.method().clone();

    let span = tracing::info_span!(
        "request",
        correlation_id = %correlation_id,
        method = %method,
        path = %request.uri().path(),
    );

    request
        .extensions_mut()
        .insert(RequestContext::new(correlation_id.clone()));

    let mut response = next.run(request).instrument(span).await;

    match header {
        Some(value) => {
            response.headers_mut().insert(X_REQUEST_ID, value);
        }
        None => tracing::warn!(correlation_id = %correlation_id, "Correlation ID not echoable"),
    }

    metrics::record_request(method.as_str(), response.status().as_u16(), started);
    response
}
