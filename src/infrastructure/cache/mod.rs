//! Multi-tier caching: an in-process LRU tier, a shared Redis-backed tier,
//! and the recent-messages domain cache layered on top.
//!
//! Tiers are independent; nothing here promises consistency between them.
//! The shared tier is best-effort and degrades to a no-op when no backend
//! is configured or the backend is unreachable.

pub mod local;
pub mod memory_backend;
pub mod recent_messages;
pub mod redis_backend;
pub mod remote;

pub use local::{LocalCache, LocalCacheStats};
pub use memory_backend::MemoryBackend;
pub use recent_messages::{RecentMessagesCache, RecentMessagesStats};
pub use redis_backend::RedisBackend;
pub use remote::{RemoteCache, RemoteCacheError, RemoteCacheStats};

pub(crate) use local::hit_rate_percent;

use thiserror::Error;

/// Invalid cache construction parameters. Fatal at construction time;
/// nothing else in the caching layer returns an error to callers.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheConfigError {
    /// Capacity must be at least one entry
    #[error("cache max_size must be positive")]
    InvalidMaxSize,

    /// TTL must be a positive duration
    #[error("cache ttl must be positive")]
    InvalidTtl,
}
