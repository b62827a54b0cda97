use serde::{Deserialize, Serialize};

/// Main configuration structure for Chatswarm's caching layer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Cache tier configuration (local + recent messages)
    #[serde(default)]
    pub cache: CacheConfig,

    /// Shared (Redis-backed) cache configuration
    #[serde(default)]
    pub redis: RedisConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Query profiler configuration
    #[serde(default)]
    pub profiler: ProfilerConfig,
}

/// Cache tier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CacheConfig {
    /// Maximum number of entries in the in-process cache
    #[serde(default = "default_local_max_size")]
    pub local_max_size: usize,

    /// Default TTL for in-process cache entries, in seconds
    #[serde(default = "default_local_ttl_secs")]
    pub local_default_ttl_secs: u64,

    /// TTL for per-chat recent-message lists, in seconds
    #[serde(default = "default_recent_ttl_secs")]
    pub recent_messages_ttl_secs: u64,

    /// Maximum messages retained per chat in the recent-messages cache
    #[serde(default = "default_recent_max")]
    pub recent_messages_max: usize,
}

const fn default_local_max_size() -> usize {
    1000
}

const fn default_local_ttl_secs() -> u64 {
    300
}

const fn default_recent_ttl_secs() -> u64 {
    60
}

const fn default_recent_max() -> usize {
    20
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            local_max_size: default_local_max_size(),
            local_default_ttl_secs: default_local_ttl_secs(),
            recent_messages_ttl_secs: default_recent_ttl_secs(),
            recent_messages_max: default_recent_max(),
        }
    }
}

/// Shared cache (Redis) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RedisConfig {
    /// Connection URL (e.g. `redis://127.0.0.1:6379/0`).
    /// When absent the shared cache runs disabled and every read is a miss.
    #[serde(default)]
    pub url: Option<String>,

    /// Default TTL for shared cache entries, in seconds
    #[serde(default = "default_redis_ttl_secs")]
    pub default_ttl_secs: u64,

    /// Per-operation deadline, in milliseconds
    #[serde(default = "default_op_timeout_ms")]
    pub op_timeout_ms: u64,
}

const fn default_redis_ttl_secs() -> u64 {
    300
}

const fn default_op_timeout_ms() -> u64 {
    2000
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: None,
            default_ttl_secs: default_redis_ttl_secs(),
            op_timeout_ms: default_op_timeout_ms(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

const fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Structured JSON lines
    Json,
    /// Human-readable output
    Pretty,
}

/// Query profiler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProfilerConfig {
    /// Samples longer than this log a warning, in milliseconds
    #[serde(default = "default_slow_query_ms")]
    pub slow_query_threshold_ms: u64,
}

const fn default_slow_query_ms() -> u64 {
    100
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            slow_query_threshold_ms: default_slow_query_ms(),
        }
    }
}
