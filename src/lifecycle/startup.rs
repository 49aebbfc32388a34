//! Startup checks.

use std::time::Duration;

use crate::resilience::with_deadline;
use crate::store::CounterStore;

/// Log whether the counter store answers. Never fails and is bounded by
/// `timeout`; the service starts either way.
pub async fn probe_counter_store(store: &dyn CounterStore, timeout: Duration) -> bool {
    let reachable = with_deadline(timeout, async { Ok(store.is_reachable().await) })
        .await
        .unwrap_or(false);

    if reachable {
        tracing::info!("Counter store available");
    } else {
        tracing::warn!("Counter store NOT available, rate limiting runs in degraded mode");
    }
    reachable
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryCounterStore;

    #[tokio::test]
    async fn reachable_store_reports_true() {
        let store = MemoryCounterStore::new();
        assert!(probe_counter_store(&store, Duration::from_millis(100)).await);
    }
}
