//! Fixed-window rate limiting backed by the shared counter store.
//!
//! Each request increments the caller's counter once. The increment that
//! creates the key starts a window of `period_secs`; the key's expiry ends
//! it. Requests numbered `1..=limit` in a window pass, later ones get 429
//! with a `Retry-After` for the rest of the window. Bursts straddling a
//! window boundary can see up to `2 × limit` requests pass.
//!
//! The limiter keeps no counts in process. A failed or slow store call is
//! handed to the configured `DegradedStrategy`.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Duration;

use crate::config::RateLimitPolicy;
use crate::error::GovernanceError;
use crate::observability::metrics;
use crate::resilience::with_deadline;
use crate::security::degraded::{DegradedOutcome, DegradedStrategy};
use crate::security::identity::ClientIdentity;
use crate::store::CounterStore;

pub const X_RATELIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";

/// Window position after a counted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    pub limit: u64,
    pub count: u64,
    pub reset_in: Duration,
}

impl Quota {
    pub fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.count)
    }

    /// Whole seconds until the window ends, never less than one.
    pub fn retry_after_secs(&self) -> u64 {
        let secs = self.reset_in.as_secs() + u64::from(self.reset_in.subsec_nanos() > 0);
        secs.max(1)
    }

    fn write_headers(&self, headers: &mut HeaderMap) {
        headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(self.limit));
        headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(self.remaining()));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed(Quota),
    Denied(Quota),
    /// Store unavailable, fail-open.
    AllowedUncounted,
    /// Store unavailable, fail-closed.
    Unavailable,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed(_) | Decision::AllowedUncounted)
    }

    fn label(&self) -> &'static str {
        match self {
            Decision::Allowed(_) => "allowed",
            Decision::Denied(_) => "denied",
            Decision::AllowedUncounted => "degraded_open",
            Decision::Unavailable => "degraded_closed",
        }
    }
}

pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    degraded: Arc<dyn DegradedStrategy>,
    limit: u64,
    period: Duration,
    store_timeout: Duration,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, policy: &RateLimitPolicy, store_timeout: Duration) -> Self {
        Self {
            store,
            degraded: policy.failure_mode.strategy(),
            limit: policy.limit,
            period: policy.period(),
            store_timeout,
        }
    }

    /// Count one request for `identity` and decide whether it may proceed.
    pub async fn check(&self, identity: &ClientIdentity) -> Decision {
        let key = identity.to_string();

        let counted = with_deadline(self.store_timeout, self.store.increment(&key, self.period)).await;

        let decision = match counted {
            Ok(window) => {
                let quota = Quota {
                    limit: self.limit,
                    count: window.count,
                    reset_in: window.expires_in,
                };
                if window.count <= self.limit {
                    Decision::Allowed(quota)
                } else {
                    Decision::Denied(quota)
                }
            }
            Err(error) => {
                metrics::record_store_failure(error.kind());
                match self.degraded.on_store_failure(&key, &error) {
                    DegradedOutcome::Allow => Decision::AllowedUncounted,
                    DegradedOutcome::Reject => Decision::Unavailable,
                }
            }
        };

        metrics::record_rate_limit_decision(decision.label());
        decision
    }
}

/// The identity stage's verdict. A request that skipped that stage
/// is counted in the shared `unknown` bucket.
fn identity_of(request: &Request<Body>) -> ClientIdentity {
    request
        .extensions()
        .get::<ClientIdentity>()
        .cloned()
        .unwrap_or(ClientIdentity::Unknown)
}

/// Third pipeline stage. Rejections short-circuit: nothing downstream runs.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let identity = identity_of(&request);

    match limiter.check(&identity).await {
        Decision::Allowed(quota) => {
            let mut response = next.run(request).await;
            quota.write_headers(response.headers_mut());
            response
        }
        Decision::AllowedUncounted => next.run(request).await,
        Decision::Denied(quota) => {
            tracing::warn!(
                client = %identity,
                count = quota.count,
                limit = quota.limit,
                retry_after_secs = quota.retry_after_secs(),
                "Rate limit exceeded"
            );
            let mut response = GovernanceError::RateLimitExceeded {
                limit: quota.limit,
                retry_after_secs: quota.retry_after_secs(),
            }
            .into_response();
            quota.write_headers(response.headers_mut());
            response
        }
        Decision::Unavailable => GovernanceError::CounterStoreUnavailable.into_response(),
    }
}
