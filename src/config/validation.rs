//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limit > 0, 0 < period <= one year, timeouts > 0)
//! - Check addresses parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::{AppConfig, StoreBackend};

/// Longest accepted window. Keeps `Instant + period` and the Redis
/// millisecond expiry far from overflow.
pub const MAX_PERIOD_SECS: u64 = 365 * 24 * 60 * 60;

/// A single semantic problem in a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be > 0"));
    }

    if config.rate_limit.limit == 0 {
        errors.push(ValidationError::new("rate_limit.limit", "must be > 0"));
    }

    if config.rate_limit.period_secs == 0 {
        errors.push(ValidationError::new("rate_limit.period_secs", "must be > 0"));
    } else if config.rate_limit.period_secs > MAX_PERIOD_SECS {
        errors.push(ValidationError::new(
            "rate_limit.period_secs",
            format!("must be <= {} (one year)", MAX_PERIOD_SECS),
        ));
    }

    if config.counter_store.timeout_ms == 0 {
        errors.push(ValidationError::new("counter_store.timeout_ms", "must be > 0"));
    }

    if config.counter_store.backend == StoreBackend::Redis && config.counter_store.url.trim().is_empty() {
        errors.push(ValidationError::new("counter_store.url", "required for the redis backend"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
