//! Health check endpoint.
//!
//! Reports whether the process is serving and whether the counter store
//! answers. A down store means `degraded`, not failure: requests are still
//! served under the configured failure mode.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::http::request::RequestContext;
use crate::http::server::AppState;
use crate::resilience::with_deadline;

#[derive(Debug, Serialize)]
pub struct DependencyStatus {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct Checks {
    pub counter_store: DependencyStatus,
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub version: &'static str,
    pub checks: Checks,
}

pub async fn health_check(State(state): State<AppState>, context: RequestContext) -> Json<HealthReport> {
    let store = state.store.clone();
    let reachable = with_deadline(state.store_timeout, async move { Ok(store.is_reachable().await) })
        .await
        .unwrap_or(false);

    tracing::debug!(
        correlation_id = %context.correlation_id,
        counter_store_up = reachable,
        "Health check"
    );

    Json(HealthReport {
        status: if reachable { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        checks: Checks {
            counter_store: DependencyStatus {
                status: if reachable { "up" } else { "down" },
            },
        },
    })
}
