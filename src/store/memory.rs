//! In-process counter store.
//!
//! Counts live in this process only, so limits are enforced per instance.
//! Used for single-instance deployments and tests. Time comes from
//! `tokio::time`, which lets paused-clock tests drive window expiry.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;

use crate::store::{CounterStore, StoreError, WindowCount};

/// Key count at which the first sweep of expired windows runs.
const PURGE_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u64,
    expires_at: Instant,
}

#[derive(Debug)]
pub struct MemoryCounterStore {
    windows: DashMap<String, Window>,
    /// Size at which the next sweep runs: twice the live keys left by the
    /// previous one, so sweeps stay amortized O(1) per increment.
    next_sweep_at: AtomicUsize,
}

impl Default for MemoryCounterStore {
    fn default() -> Self {
        Self {
            windows: DashMap::new(),
            next_sweep_at: AtomicUsize::new(PURGE_THRESHOLD),
        }
    }
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held, expired or not.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Drop windows whose expiry has passed.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.windows.retain(|_, window| window.expires_at > now);
    }

    fn sweep_if_grown(&self) {
        let threshold = self.next_sweep_at.load(Ordering::Relaxed);
        if self.windows.len() < threshold {
            return;
        }
        // One caller wins the sweep; the rest carry on counting.
        let claimed = self
            .next_sweep_at
            .compare_exchange(threshold, usize::MAX, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok();
        if claimed {
            self.purge_expired();
            let next = self.windows.len().saturating_mul(2).max(PURGE_THRESHOLD);
            self.next_sweep_at.store(next, Ordering::Release);
        }
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn increment(&self, key: &str, period: Duration) -> Result<WindowCount, StoreError> {
        self.sweep_if_grown();

        let now = Instant::now();
        let expires_at = now
            .checked_add(period)
            .ok_or_else(|| StoreError::Unavailable(format!("window period {:?} out of range", period)))?;

        // The entry guard holds the shard lock, so expiry check, reset and
        // increment happen as one step per key.
        let mut entry = self.windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            expires_at,
        });

        if entry.expires_at <= now {
            *entry = Window { count: 0, expires_at };
        }

        entry.count += 1;

        Ok(WindowCount {
            count: entry.count,
            expires_in: entry.expires_at.saturating_duration_since(now),
        })
    }

    async fn is_reachable(&self) -> bool {
        true
    }
}
