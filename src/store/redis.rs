//! Redis-backed counter store.
//!
//! Holds the rate-limit windows for every running instance of the service,
//! so the limit is a global ceiling rather than a per-process one.
//!
//! ## Atomicity
//!
//! Increment, first-expiry and TTL read run inside one Lua script. Redis
//! executes scripts without interleaving other commands, so concurrent
//! increments from different instances can neither lose counts nor each
//! restart the window.
//!
//! ## Connection handling
//!
//! The `ConnectionManager` is created lazily on first use. A store that is
//! down at boot leaves the cell empty and every later call retries, so the
//! process starts regardless and recovers on the next successful round-trip.
//! Once established, the manager reconnects on its own.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{Client, RedisError, Script};
use std::fmt;
use std::time::Duration;
use tokio::sync::OnceCell;

use crate::store::{CounterStore, StoreError, WindowCount};

/// KEYS[1] = counter key, ARGV[1] = window length in milliseconds.
/// Returns `{count, pttl_ms}`. A key left without a TTL (should never happen)
/// gets one so it cannot count forever.
const INCREMENT_SCRIPT: &str = r#"
local count = redis.call('INCR', KEYS[1])
if count == 1 then
    redis.call('PEXPIRE', KEYS[1], ARGV[1])
end
local ttl = redis.call('PTTL', KEYS[1])
if ttl < 0 then
    redis.call('PEXPIRE', KEYS[1], ARGV[1])
    ttl = tonumber(ARGV[1])
end
return {count, ttl}
"#;

pub struct RedisCounterStore {
    client: Client,
    connection: OnceCell<ConnectionManager>,
    script: Script,
    key_prefix: String,
}

impl fmt::Debug for RedisCounterStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCounterStore")
            .field("key_prefix", &self.key_prefix)
            .field("connected", &self.connection.initialized())
            .finish_non_exhaustive()
    }
}

impl RedisCounterStore {
    /// Parse the URL and prepare the store. Does not connect.
    ///
    /// # Errors
    /// Returns `StoreError::Unavailable` if the URL is malformed.
    pub fn open(url: &str, key_prefix: impl Into<String>) -> Result<Self, StoreError> {
        let client = Client::open(url).map_err(unavailable)?;

        Ok(Self {
            client,
            connection: OnceCell::new(),
            script: Script::new(INCREMENT_SCRIPT),
            key_prefix: key_prefix.into(),
        })
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    async fn connection(&self) -> Result<ConnectionManager, RedisError> {
        let manager = self
            .connection
            .get_or_try_init(|| async {
                let manager = ConnectionManager::new(self.client.clone()).await?;
                tracing::info!("Connected to Redis counter store");
                Ok::<_, RedisError>(manager)
            })
            .await?;

        Ok(manager.clone())
    }
}

fn unavailable(err: RedisError) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

/// Expiry argument for `PEXPIRE`, which takes a signed 64-bit count.
fn millis(duration: Duration) -> Result<i64, StoreError> {
    i64::try_from(duration.as_millis())
        .map(|ms| ms.max(1))
        .map_err(|_| StoreError::Unavailable(format!("window period {:?} out of range", duration)))
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn increment(&self, key: &str, period: Duration) -> Result<WindowCount, StoreError> {
        let period_ms = millis(period)?;
        let mut conn = self.connection().await.map_err(unavailable)?;

        let (count, ttl_ms): (u64, i64) = self
            .script
            .key(self.key(key))
            .arg(period_ms)
            .invoke_async(&mut conn)
            .await
            .map_err(unavailable)?;

        Ok(WindowCount {
            count,
            expires_in: Duration::from_millis(ttl_ms.max(0) as u64),
        })
    }

    async fn is_reachable(&self) -> bool {
        let mut conn = match self.connection().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::debug!(error = %e, "Redis connection failed");
                return false;
            }
        };

        let pong: Result<String, RedisError> = redis::cmd("PING").query_async(&mut conn).await;
        pong.is_ok()
    }
}
