//! Integration tests for the Redis counter store.
//!
//! These tests require a Redis instance. They are ignored by default; run
//! with `REDIS_URL=redis://127.0.0.1/ cargo test --test redis_store -- --ignored`.

use axum::http::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use techstore_api::config::{FailureMode, RateLimitPolicy};
use techstore_api::http::{HttpServer, X_REQUEST_ID};
use techstore_api::resilience::with_deadline;
use techstore_api::security::{ClientIdentity, Decision, RateLimiter};
use techstore_api::store::{CounterStore, RedisCounterStore, StoreError};
use uuid::Uuid;

mod common;
use common::{body_json, get_from, header};

/// Nothing listens on port 1.
const DEAD_REDIS: &str = "redis://127.0.0.1:1/";

fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1/".to_string())
}

/// Store with a unique prefix so runs never share counters.
async fn test_store() -> Option<RedisCounterStore> {
    let prefix = format!("test:{}:", Uuid::new_v4());
    let store = RedisCounterStore::open(&redis_url(), prefix).ok()?;
    if store.is_reachable().await {
        Some(store)
    } else {
        eprintln!("Skipping test: Redis not available at {}", redis_url());
        None
    }
}

#[tokio::test]
#[ignore] // Requires Redis
async fn only_first_increment_sets_expiry() {
    let Some(store) = test_store().await else { return };
    let period = Duration::from_secs(60);

    let first = store.increment("ip:10.0.0.1", period).await.unwrap();
    assert_eq!(first.count, 1);
    assert!(first.expires_in <= period);

    tokio::time::sleep(Duration::from_millis(1100)).await;

    let second = store.increment("ip:10.0.0.1", period).await.unwrap();
    assert_eq!(second.count, 2);
    assert!(second.expires_in < Duration::from_secs(59), "expiry must not be refreshed");
}

#[tokio::test]
#[ignore] // Requires Redis
async fn key_expiry_starts_new_window() {
    let Some(store) = test_store().await else { return };
    let period = Duration::from_secs(1);

    store.increment("k", period).await.unwrap();
    store.increment("k", period).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1200)).await;

    assert_eq!(store.increment("k", period).await.unwrap().count, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore] // Requires Redis
async fn concurrent_increments_never_overshoot() {
    let Some(store) = test_store().await else { return };

    let policy = RateLimitPolicy {
        limit: 10,
        period_secs: 60,
        failure_mode: FailureMode::FailClosed,
        ..RateLimitPolicy::default()
    };
    let limiter = Arc::new(RateLimiter::new(Arc::new(store), &policy, Duration::from_secs(2)));

    let tasks: Vec<_> = (0..50)
        .map(|_| {
            let limiter = limiter.clone();
            tokio::spawn(async move { limiter.check(&ClientIdentity::Principal("burst".into())).await })
        })
        .collect();

    let results = futures_util::future::join_all(tasks).await;
    let allowed = results
        .iter()
        .filter(|r| matches!(r, Ok(Decision::Allowed(_))))
        .count();
    let denied = results
        .iter()
        .filter(|r| matches!(r, Ok(Decision::Denied(_))))
        .count();

    assert_eq!((allowed, denied), (10, 40));
}

#[tokio::test]
async fn unreachable_redis_fails_within_deadline() {
    let store = RedisCounterStore::open(DEAD_REDIS, "test:").unwrap();
    let started = std::time::Instant::now();

    let result = with_deadline(
        Duration::from_millis(250),
        store.increment("k", Duration::from_secs(60)),
    )
    .await;

    assert!(
        matches!(result, Err(StoreError::Timeout(_)) | Err(StoreError::Unavailable(_))),
        "got {:?}",
        result
    );
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn starts_with_redis_down_and_serves_fail_open() {
    let store = Arc::new(RedisCounterStore::open(DEAD_REDIS, "test:").unwrap());
    let server = HttpServer::new(common::config(3, 60, FailureMode::FailOpen), store);

    for _ in 0..2 {
        let response = server
            .router()
            .oneshot(get_from("10.9.9.9:5000", "/health_check"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(header(&response, X_REQUEST_ID).is_some());
        assert!(header(&response, "x-ratelimit-remaining").is_none());
        assert_eq!(body_json(response).await["checks"]["counter_store"]["status"], "down");
    }
}

#[tokio::test]
async fn starts_with_redis_down_and_rejects_fail_closed() {
    let store = Arc::new(RedisCounterStore::open(DEAD_REDIS, "test:").unwrap());
    let server = HttpServer::new(common::config(3, 60, FailureMode::FailClosed), store);

    let response = server
        .router()
        .oneshot(get_from("10.9.9.9:5000", "/health_check"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(header(&response, X_REQUEST_ID).is_some());
    assert_eq!(body_json(response).await["detail"], "Rate limiting temporarily unavailable");
}
