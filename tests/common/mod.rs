//! Shared utilities for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::Request;
use axum::response::Response;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use techstore_api::config::{AppConfig, FailureMode, StoreBackend};
use techstore_api::store::{CounterStore, MemoryCounterStore, StoreError, WindowCount};

/// In-memory store that can be switched off to simulate an outage.
#[derive(Debug, Default)]
pub struct SwitchableStore {
    inner: MemoryCounterStore,
    down: AtomicBool,
}

impl SwitchableStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.down.store(!reachable, Ordering::SeqCst);
    }
}

#[async_trait]
impl CounterStore for SwitchableStore {
    async fn increment(&self, key: &str, period: Duration) -> Result<WindowCount, StoreError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("simulated outage".into()));
        }
        self.inner.increment(key, period).await
    }

    async fn is_reachable(&self) -> bool {
        !self.down.load(Ordering::SeqCst)
    }
}

pub fn config(limit: u64, period_secs: u64, failure_mode: FailureMode) -> AppConfig {
    let mut config = AppConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.rate_limit.limit = limit;
    config.rate_limit.period_secs = period_secs;
    config.rate_limit.failure_mode = failure_mode;
    config.counter_store.backend = StoreBackend::Memory;
    config
}

/// GET `path` as if sent from `peer`.
pub fn get_from(peer: &str, path: &str) -> Request<Body> {
    let peer: SocketAddr = peer.parse().unwrap();
    let mut request = Request::builder().uri(path).body(Body::empty()).unwrap();
    request.extensions_mut().insert(ConnectInfo(peer));
    request
}

pub fn header<'a>(response: &'a Response, name: &str) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
