//! Degraded-mode strategies for an unreachable counter store.
//!
//! The limiter holds one of these, chosen from `FailureMode` at startup, and
//! consults it for every request whose store call failed. Nothing is cached
//! between requests, so the first successful round-trip ends degraded mode.

use std::sync::Arc;

use crate::config::FailureMode;
use crate::store::StoreError;

/// What to do with a request that could not be counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegradedOutcome {
    /// Let it through uncounted.
    Allow,
    /// Reject with service-unavailable.
    Reject,
}

pub trait DegradedStrategy: Send + Sync {
    fn on_store_failure(&self, client: &str, error: &StoreError) -> DegradedOutcome;
}

/// Availability over strictness.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailOpen;

impl DegradedStrategy for FailOpen {
    fn on_store_failure(&self, client: &str, error: &StoreError) -> DegradedOutcome {
        tracing::warn!(
            client = %client,
            error = %error,
            "Counter store unavailable, allowing request uncounted"
        );
        DegradedOutcome::Allow
    }
}

/// Strictness over availability.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailClosed;

impl DegradedStrategy for FailClosed {
    fn on_store_failure(&self, client: &str, error: &StoreError) -> DegradedOutcome {
        tracing::error!(
            client = %client,
            error = %error,
            "Counter store unavailable, rejecting request"
        );
        DegradedOutcome::Reject
    }
}

impl FailureMode {
    pub fn strategy(self) -> Arc<dyn DegradedStrategy> {
        match self {
            FailureMode::FailOpen => Arc::new(FailOpen),
            FailureMode::FailClosed => Arc::new(FailClosed),
        }
    }
}
