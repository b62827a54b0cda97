//! Redis adapter for the [`CacheBackend`] port.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;
use tracing::info;

use crate::domain::ports::{CacheBackend, CacheBackendError};

impl From<redis::RedisError> for CacheBackendError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_refusal() || err.is_connection_dropped() || err.is_timeout() {
            Self::Unavailable(err.to_string())
        } else {
            Self::Protocol(err.to_string())
        }
    }
}

/// [`CacheBackend`] over a Redis connection manager.
///
/// The manager multiplexes one connection and reconnects on failure, so a
/// single `RedisBackend` is shared by every cache tier in the process.
pub struct RedisBackend {
    manager: ConnectionManager,
}

impl RedisBackend {
    /// Connect to Redis at `url` (e.g. `redis://127.0.0.1:6379/0`).
    ///
    /// # Errors
    /// Returns [`CacheBackendError::Unavailable`] if the URL is malformed
    /// or the initial handshake fails.
    pub async fn connect(url: &str) -> Result<Self, CacheBackendError> {
        let client = redis::Client::open(url)
            .map_err(|err| CacheBackendError::Unavailable(err.to_string()))?;
        let manager = ConnectionManager::new(client).await?;
        info!(url, "connected to redis cache backend");
        Ok(Self { manager })
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheBackendError> {
        let mut conn = self.manager.clone();
        let value: Option<Vec<u8>> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_ex(
        &self,
        key: &str,
        ttl: Duration,
        value: &[u8],
    ) -> Result<(), CacheBackendError> {
        let mut conn = self.manager.clone();
        // SETEX takes whole seconds; never round a positive TTL down to zero
        let seconds = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, seconds).await?;
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<u64, CacheBackendError> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.manager.clone();
        let removed: u64 = conn.del(keys).await?;
        Ok(removed)
    }

    async fn scan_match(&self, pattern: &str) -> Result<Vec<String>, CacheBackendError> {
        let mut conn = self.manager.clone();
        let mut keys = Vec::new();
        let mut iter = conn.scan_match::<_, String>(pattern).await?;
        while let Some(key) = iter.next_item().await {
            keys.push(key);
        }
        Ok(keys)
    }

    async fn flush_all(&self) -> Result<(), CacheBackendError> {
        let mut conn = self.manager.clone();
        redis::cmd("FLUSHDB").query_async::<()>(&mut conn).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheBackendError> {
        let mut conn = self.manager.clone();
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }
}
