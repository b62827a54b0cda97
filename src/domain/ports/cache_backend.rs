use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by a cache backend.
///
/// The cache tiers absorb these at their boundary; they never reach
/// application code.
#[derive(Error, Debug)]
pub enum CacheBackendError {
    /// The backend could not be reached or refused the operation
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),

    /// The backend answered with something the adapter could not interpret
    #[error("cache backend protocol error: {0}")]
    Protocol(String),
}

/// Capability contract for a TTL-aware key/value store.
///
/// Implemented by [`RedisBackend`](crate::infrastructure::cache::RedisBackend)
/// for shared deployments and by
/// [`MemoryBackend`](crate::infrastructure::cache::MemoryBackend) for tests
/// and single-process runs. Keys are ASCII; values are opaque byte strings.
///
/// Implementations must be safe for concurrent use: the same handle is
/// shared by every cache tier in the process.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Fetch the raw bytes stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheBackendError>;

    /// Store `value` under `key` with expiry after `ttl`.
    async fn set_ex(&self, key: &str, ttl: Duration, value: &[u8]) -> Result<(), CacheBackendError>;

    /// Remove the given keys in one batch, returning how many existed.
    async fn delete(&self, keys: &[String]) -> Result<u64, CacheBackendError>;

    /// Collect all keys matching a glob pattern (`*` wildcard).
    ///
    /// Implementations iterate with a non-blocking cursor scan; they must
    /// not stall the store while enumerating.
    async fn scan_match(&self, pattern: &str) -> Result<Vec<String>, CacheBackendError>;

    /// Remove every key in the logical namespace. Destructive.
    async fn flush_all(&self) -> Result<(), CacheBackendError>;

    /// Liveness probe.
    async fn ping(&self) -> Result<(), CacheBackendError>;
}
