use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid local_max_size: {0}. Must be at least 1")]
    InvalidLocalMaxSize(usize),

    #[error("Invalid local_default_ttl_secs: {0}. Must be positive")]
    InvalidLocalTtl(u64),

    #[error("Invalid recent_messages_ttl_secs: {0}. Must be positive")]
    InvalidRecentTtl(u64),

    #[error("Invalid recent_messages_max: {0}. Must be at least 1")]
    InvalidRecentMax(usize),

    #[error("Invalid redis default_ttl_secs: {0}. Must be positive")]
    InvalidRedisTtl(u64),

    #[error("Invalid redis op_timeout_ms: {0}. Must be positive")]
    InvalidOpTimeout(u64),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid slow_query_threshold_ms: {0}. Must be positive")]
    InvalidSlowThreshold(u64),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .chatswarm/config.yaml (project config)
    /// 3. .chatswarm/local.yaml (project local overrides, optional)
    /// 4. Environment variables (`CHATSWARM_*` prefix, highest priority)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".chatswarm/config.yaml"))
            .merge(Yaml::file(".chatswarm/local.yaml"))
            .merge(Env::prefixed("CHATSWARM_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context("Failed to extract configuration from file")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate a configuration, surfacing the first violation found.
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.cache.local_max_size == 0 {
            return Err(ConfigError::InvalidLocalMaxSize(config.cache.local_max_size));
        }
        if config.cache.local_default_ttl_secs == 0 {
            return Err(ConfigError::InvalidLocalTtl(config.cache.local_default_ttl_secs));
        }
        if config.cache.recent_messages_ttl_secs == 0 {
            return Err(ConfigError::InvalidRecentTtl(config.cache.recent_messages_ttl_secs));
        }
        if config.cache.recent_messages_max == 0 {
            return Err(ConfigError::InvalidRecentMax(config.cache.recent_messages_max));
        }
        if config.redis.default_ttl_secs == 0 {
            return Err(ConfigError::InvalidRedisTtl(config.redis.default_ttl_secs));
        }
        if config.redis.op_timeout_ms == 0 {
            return Err(ConfigError::InvalidOpTimeout(config.redis.op_timeout_ms));
        }
        if !matches!(
            config.logging.level.as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        ) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }
        if config.profiler.slow_query_threshold_ms == 0 {
            return Err(ConfigError::InvalidSlowThreshold(
                config.profiler.slow_query_threshold_ms,
            ));
        }
        Ok(())
    }
}
