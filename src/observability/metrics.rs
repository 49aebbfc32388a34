//! Metrics collection and exposition.
//!
//! # Metrics
//! - `techstore_requests_total` (counter): requests by method, status
//! - `techstore_request_duration_seconds` (histogram): latency distribution
//! - `techstore_rate_limit_decisions_total` (counter): limiter outcomes
//! - `techstore_counter_store_failures_total` (counter): store errors by kind

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, started: Instant) {
    counter!(
        "techstore_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("techstore_request_duration_seconds", "method" => method.to_string())
        .record(started.elapsed().as_secs_f64());
}

/// `decision` is one of `allowed`, `denied`, `degraded_open`, `degraded_closed`.
pub fn record_rate_limit_decision(decision: &'static str) {
    counter!("techstore_rate_limit_decisions_total", "decision" => decision).increment(1);
}

pub fn record_store_failure(kind: &'static str) {
    counter!("techstore_counter_store_failures_total", "kind" => kind).increment(1);
}
