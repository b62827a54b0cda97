//! Port traits decoupling the cache tiers from concrete backends.

pub mod cache_backend;

pub use cache_backend::{CacheBackend, CacheBackendError};
