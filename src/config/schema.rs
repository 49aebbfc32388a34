//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the API.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the API service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Rate limiting policy.
    pub rate_limit: RateLimitPolicy,

    /// Shared counter store connection parameters.
    pub counter_store: CounterStoreConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// What the rate limiter does when the counter store cannot answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum FailureMode {
    /// Let the request through uncounted.
    #[default]
    FailOpen,
    /// Reject the request with 503.
    FailClosed,
}

impl std::str::FromStr for FailureMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail-open" | "fail_open" | "open" => Ok(FailureMode::FailOpen),
            "fail-closed" | "fail_closed" | "closed" => Ok(FailureMode::FailClosed),
            other => Err(format!("unknown failure mode '{}'", other)),
        }
    }
}

/// Process-wide rate limiting policy. Immutable once loaded.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitPolicy {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Maximum requests per window per client identity.
    pub limit: u64,

    /// Window length in seconds.
    pub period_secs: u64,

    /// Behaviour when the counter store is unreachable.
    pub failure_mode: FailureMode,

    /// Take the origin address from the first `X-Forwarded-For` hop.
    /// Only enable behind a proxy that overwrites the header.
    pub trust_forwarded_for: bool,
}

impl RateLimitPolicy {
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            limit: 100,
            period_secs: 60,
            failure_mode: FailureMode::FailOpen,
            trust_forwarded_for: false,
        }
    }
}

/// Which counter store implementation backs the limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Redis, shared by every running instance.
    #[default]
    Redis,
    /// In-process map. Limits are per instance.
    Memory,
}

/// Counter store connection parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CounterStoreConfig {
    pub backend: StoreBackend,

    /// Redis connection URL.
    pub url: String,

    /// Prefix prepended to every counter key.
    pub key_prefix: String,

    /// Upper bound for a single store round-trip in milliseconds.
    pub timeout_ms: u64,
}

impl CounterStoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for CounterStoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Redis,
            url: "redis://127.0.0.1:6379/0".to_string(),
            key_prefix: "rate_limit:".to_string(),
            timeout_ms: 250,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
