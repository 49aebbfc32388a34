//! Shared counter store subsystem.
//!
//! # Data Flow
//! ```text
//! RateLimiter
//!     → CounterStore::increment(key, period)
//!         → redis.rs  (Lua INCR + conditional PEXPIRE, global across instances)
//!         → memory.rs (DashMap entry, single instance)
//!     ← WindowCount { count, expires_in } | StoreError
//! ```
//!
//! # Design Decisions
//! - The store owns all rate-limit state; service instances hold none
//! - Increment and first-expiry are one atomic operation, never read-then-write
//! - Backend-specific errors stop at this boundary as `StoreError`

pub mod memory;
pub mod redis;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::{CounterStoreConfig, StoreBackend};

pub use self::memory::MemoryCounterStore;
pub use self::redis::RedisCounterStore;

/// Uniform failure signal for every counter store backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("counter store unavailable: {0}")]
    Unavailable(String),

    #[error("counter store timed out after {0:?}")]
    Timeout(Duration),
}

impl StoreError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::Unavailable(_) => "unavailable",
            StoreError::Timeout(_) => "timeout",
        }
    }
}

/// Window state observed right after an increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCount {
    /// Requests seen in the current window, including this one.
    pub count: u64,
    /// Time left until the window's key expires.
    pub expires_in: Duration,
}

#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically increment `key`. Only the increment that creates the key
    /// sets its expiry to `period`; later increments leave it untouched.
    async fn increment(&self, key: &str, period: Duration) -> Result<WindowCount, StoreError>;

    /// Liveness probe.
    async fn is_reachable(&self) -> bool;
}

/// Build the configured backend. Never connects eagerly.
pub fn from_config(config: &CounterStoreConfig) -> Result<Arc<dyn CounterStore>, StoreError> {
    match config.backend {
        StoreBackend::Redis => {
            let store = RedisCounterStore::open(&config.url, config.key_prefix.clone())?;
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => Ok(Arc::new(MemoryCounterStore::new())),
    }
}
