//! Infrastructure layer: cache tiers, backends, configuration, logging.

pub mod cache;
pub mod config;
pub mod logging;
