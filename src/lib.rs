//! Chatswarm caching layer
//!
//! Chatswarm simulates a multi-agent chat workload: many bot personas
//! periodically generate messages via an LLM backend and deliver them to a
//! messaging platform. This crate is the caching core that collapses the
//! per-tick database and LLM traffic behind that loop:
//!
//! - **LocalCache**: in-process bounded LRU with per-entry TTL, for small
//!   hot lookups (enabled-bot lists, chat settings)
//! - **RemoteCache**: best-effort shared cache over Redis with JSON values,
//!   degrading to a no-op when no backend is configured
//! - **RecentMessagesCache**: per-chat bounded recent-message lists over
//!   the shared cache, with short TTL and explicit invalidation
//! - **QueryProfiler**: scoped timing with aggregate statistics, used to
//!   validate cache effectiveness
//!
//! # Architecture
//!
//! The crate follows a hexagonal layout:
//!
//! - **Domain Layer** (`domain`): models and the `CacheBackend` port
//! - **Infrastructure Layer** (`infrastructure`): cache tiers, backend
//!   adapters, configuration, logging
//! - **Service Layer** (`services`): the query profiler
//!
//! # Example
//!
//! ```
//! use chatswarm::{LocalCache, QueryProfiler};
//! use std::time::Duration;
//!
//! let cache: LocalCache<Vec<i64>> = LocalCache::new(100, Duration::from_secs(60)).unwrap();
//! let profiler = QueryProfiler::new();
//!
//! let enabled_bots = {
//!     let _scope = profiler.profile("load_enabled_bots");
//!     cache.get("bots:enabled").unwrap_or_else(|| {
//!         let fresh = vec![1, 2, 3]; // would come from the database
//!         cache.set("bots:enabled", fresh.clone());
//!         fresh
//!     })
//! };
//! assert_eq!(enabled_bots, vec![1, 2, 3]);
//! ```

pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::models::{
    CacheConfig, CachedMessage, ChatMessage, Config, LogFormat, LoggingConfig, ProfilerConfig,
    RedisConfig,
};
pub use domain::ports::{CacheBackend, CacheBackendError};
pub use infrastructure::cache::{
    CacheConfigError, LocalCache, LocalCacheStats, MemoryBackend, RecentMessagesCache,
    RecentMessagesStats, RedisBackend, RemoteCache, RemoteCacheError, RemoteCacheStats,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{ProfilerStats, QueryProfiler, QueryScope};
