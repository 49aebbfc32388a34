//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap counter store calls with a deadline
//! - Cancel the in-flight call cleanly on timeout
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other errors but handled the same way
//! - A cancelled increment may still land at the store; that only over-counts

use std::future::Future;
use std::time::Duration;

use crate::store::StoreError;

/// Run a store operation, failing with `StoreError::Timeout` after `deadline`.
pub async fn with_deadline<T, F>(deadline: Duration, operation: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(deadline, operation).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(deadline)),
    }
}
