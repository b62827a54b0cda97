//! Domain models shared across cache tiers and services.

pub mod config;
pub mod message;

pub use config::{CacheConfig, Config, LogFormat, LoggingConfig, ProfilerConfig, RedisConfig};
pub use message::{CachedMessage, ChatMessage};
