//! Best-effort shared cache over an injected [`CacheBackend`].
//!
//! Values are UTF-8 JSON; anything implementing `Serialize` can be stored
//! (non-JSON-native scalars such as timestamps coerce through their string
//! forms via serde). Every backend failure is absorbed here: logged at
//! warning and translated to a miss / `false` / `0`, so the surrounding
//! system degrades to its source of truth instead of failing.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::domain::models::RedisConfig;
use crate::domain::ports::{CacheBackend, CacheBackendError};

use super::hit_rate_percent;
use super::RedisBackend;

/// Errors surfaced by [`RemoteCache::try_get`] for layered callers that
/// keep their own error accounting. The plain accessors absorb these.
#[derive(Error, Debug)]
pub enum RemoteCacheError {
    /// The backend failed or refused the operation
    #[error(transparent)]
    Backend(#[from] CacheBackendError),

    /// The per-operation deadline expired
    #[error("cache operation timed out")]
    Timeout,

    /// The stored bytes were not valid JSON for the requested type
    #[error("failed to decode cached value: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Snapshot of [`RemoteCache`] counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemoteCacheStats {
    /// Reads that decoded a stored value
    pub hits: u64,
    /// Reads that found nothing, failed, or hit a disabled cache
    pub misses: u64,
    /// `100 * hits / (hits + misses)`, rounded to two decimals
    pub hit_rate_percent: f64,
    /// Whether a backend is configured
    pub enabled: bool,
}

/// Shared, best-effort cache tier.
///
/// Constructed with an optional backend: with `None` the cache runs
/// disabled, where every read is a miss (still counted, so hit rates
/// reflect the real workload) and every write or delete reports failure.
/// No internal lock is held across backend I/O; counters are plain
/// atomics.
pub struct RemoteCache {
    backend: Option<Arc<dyn CacheBackend>>,
    default_ttl: Duration,
    op_timeout: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl RemoteCache {
    /// Create a cache over `backend`, or a disabled cache when `None`.
    pub fn new(
        backend: Option<Arc<dyn CacheBackend>>,
        default_ttl: Duration,
        op_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            default_ttl,
            op_timeout,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// A cache with no backend: reads miss, writes fail.
    pub fn disabled() -> Self {
        Self::new(None, Duration::from_secs(300), Duration::from_secs(2))
    }

    /// Build from configuration, connecting to Redis when a URL is set.
    ///
    /// # Errors
    /// Returns an error if a URL is configured but the initial connection
    /// handshake fails. An absent URL yields a disabled cache, not an error.
    pub async fn from_config(config: &RedisConfig) -> anyhow::Result<Self> {
        let backend: Option<Arc<dyn CacheBackend>> = match &config.url {
            Some(url) => Some(Arc::new(RedisBackend::connect(url).await?)),
            None => {
                debug!("no redis url configured, shared cache disabled");
                None
            }
        };
        Ok(Self::new(
            backend,
            Duration::from_secs(config.default_ttl_secs),
            Duration::from_millis(config.op_timeout_ms),
        ))
    }

    /// Whether a backend is configured.
    pub fn enabled(&self) -> bool {
        self.backend.is_some()
    }

    /// Read and decode a value, surfacing backend failures to the caller.
    ///
    /// Hit/miss counters move exactly as for [`get`](Self::get): failed and
    /// disabled reads count as misses.
    pub async fn try_get<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<T>, RemoteCacheError> {
        let Some(backend) = self.backend.as_ref() else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        };

        let raw = match timeout(self.op_timeout, backend.get(key)).await {
            Err(_) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return Err(RemoteCacheError::Timeout);
            }
            Ok(Err(err)) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return Err(err.into());
            }
            Ok(Ok(None)) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return Ok(None);
            }
            Ok(Ok(Some(bytes))) => bytes,
        };

        match serde_json::from_slice(&raw) {
            Ok(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(value))
            }
            Err(err) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Err(err.into())
            }
        }
    }

    /// Read and decode a value; any failure behaves as a miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.try_get(key).await {
            Ok(value) => value,
            Err(err) => {
                warn!(key, error = %err, "shared cache read failed");
                None
            }
        }
    }

    /// JSON-encode and store a value with the default TTL.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> bool {
        self.set_with_ttl(key, value, self.default_ttl).await
    }

    /// JSON-encode and store a value with an explicit TTL.
    ///
    /// Returns `false` on a disabled cache, an unencodable value, a backend
    /// failure, or deadline expiry. Never panics or propagates.
    pub async fn set_with_ttl<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> bool {
        let Some(backend) = self.backend.as_ref() else {
            return false;
        };

        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(key, error = %err, "failed to encode cache value");
                return false;
            }
        };

        match timeout(self.op_timeout, backend.set_ex(key, ttl, &bytes)).await {
            Ok(Ok(())) => true,
            Ok(Err(err)) => {
                warn!(key, error = %err, "shared cache write failed");
                false
            }
            Err(_) => {
                warn!(key, "shared cache write timed out");
                false
            }
        }
    }

    /// Remove a key, reporting whether it existed. `false` when disabled.
    pub async fn delete(&self, key: &str) -> bool {
        let Some(backend) = self.backend.as_ref() else {
            return false;
        };

        match timeout(self.op_timeout, backend.delete(&[key.to_string()])).await {
            Ok(Ok(removed)) => removed > 0,
            Ok(Err(err)) => {
                warn!(key, error = %err, "shared cache delete failed");
                false
            }
            Err(_) => {
                warn!(key, "shared cache delete timed out");
                false
            }
        }
    }

    /// Remove every key matching a backend glob (`*` wildcard), returning
    /// how many were removed. `0` when disabled or on failure.
    pub async fn delete_pattern(&self, pattern: &str) -> u64 {
        let Some(backend) = self.backend.as_ref() else {
            return 0;
        };

        let keys = match timeout(self.op_timeout, backend.scan_match(pattern)).await {
            Ok(Ok(keys)) => keys,
            Ok(Err(err)) => {
                warn!(pattern, error = %err, "shared cache scan failed");
                return 0;
            }
            Err(_) => {
                warn!(pattern, "shared cache scan timed out");
                return 0;
            }
        };

        if keys.is_empty() {
            return 0;
        }

        match timeout(self.op_timeout, backend.delete(&keys)).await {
            Ok(Ok(removed)) => removed,
            Ok(Err(err)) => {
                warn!(pattern, error = %err, "shared cache batch delete failed");
                0
            }
            Err(_) => {
                warn!(pattern, "shared cache batch delete timed out");
                0
            }
        }
    }

    /// Flush the entire logical namespace. Destructive: every key goes,
    /// not just the ones this process wrote. `false` when disabled or on
    /// failure.
    pub async fn clear(&self) -> bool {
        let Some(backend) = self.backend.as_ref() else {
            return false;
        };

        match timeout(self.op_timeout, backend.flush_all()).await {
            Ok(Ok(())) => true,
            Ok(Err(err)) => {
                warn!(error = %err, "shared cache flush failed");
                false
            }
            Err(_) => {
                warn!("shared cache flush timed out");
                false
            }
        }
    }

    /// Probe the backend. `false` when disabled, unreachable, or slow.
    pub async fn ping(&self) -> bool {
        let Some(backend) = self.backend.as_ref() else {
            return false;
        };
        matches!(timeout(self.op_timeout, backend.ping()).await, Ok(Ok(())))
    }

    /// Snapshot counters.
    pub fn stats(&self) -> RemoteCacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        RemoteCacheStats {
            hits,
            misses,
            hit_rate_percent: hit_rate_percent(hits, misses),
            enabled: self.enabled(),
        }
    }

    /// Zero the hit/miss counters.
    pub fn reset_stats(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}
