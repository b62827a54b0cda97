//! Per-chat recent-message lists over the shared cache.
//!
//! Collapses the per-tick "what was just said in this chat" query that
//! every bot persona issues before generating a reply. Entries live under
//! `messages:chat_{chat_id}:recent` with a short TTL; any write that
//! changes a chat's recent set must invalidate that chat's key.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::domain::models::CachedMessage;

use super::{CacheConfigError, RemoteCache};

/// Snapshot of [`RecentMessagesCache`] counters.
///
/// Hits and misses come from the underlying shared cache; `errors` counts
/// reads that failed at the backend rather than merely missing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentMessagesStats {
    /// Reads that decoded a stored list
    pub hits: u64,
    /// Reads that found nothing, failed, or hit a disabled cache
    pub misses: u64,
    /// `100 * hits / (hits + misses)`, rounded to two decimals
    pub hit_rate_percent: f64,
    /// Backend failures observed on reads
    pub errors: u64,
    /// Whether the shared cache has a backend
    pub enabled: bool,
}

/// Domain cache for the last few messages of each chat.
pub struct RecentMessagesCache {
    remote: Arc<RemoteCache>,
    ttl: Duration,
    max_messages: usize,
    errors: AtomicU64,
}

impl RecentMessagesCache {
    /// Create a cache storing at most `max_messages` per chat with the
    /// given TTL.
    ///
    /// # Errors
    /// Returns [`CacheConfigError`] if `max_messages` is zero or `ttl` is
    /// not positive.
    pub fn new(
        remote: Arc<RemoteCache>,
        ttl: Duration,
        max_messages: usize,
    ) -> Result<Self, CacheConfigError> {
        if max_messages == 0 {
            return Err(CacheConfigError::InvalidMaxSize);
        }
        if ttl.is_zero() {
            return Err(CacheConfigError::InvalidTtl);
        }

        Ok(Self {
            remote,
            ttl,
            max_messages,
            errors: AtomicU64::new(0),
        })
    }

    fn key(chat_id: i64) -> String {
        format!("messages:chat_{chat_id}:recent")
    }

    /// Fetch the cached recent messages for a chat.
    ///
    /// Returns `None` on a miss or on any backend failure; failures bump
    /// the `errors` counter so operators can tell the two apart.
    pub async fn get(&self, chat_id: i64) -> Option<Vec<CachedMessage>> {
        match self.remote.try_get(&Self::key(chat_id)).await {
            Ok(messages) => messages,
            Err(err) => {
                self.errors.fetch_add(1, Ordering::Relaxed);
                warn!(chat_id, error = %err, "recent messages read failed");
                None
            }
        }
    }

    /// Store a chat's recent messages, keeping only the first
    /// `max_messages` entries in caller order.
    pub async fn set(&self, chat_id: i64, messages: &[CachedMessage]) -> bool {
        let capped = &messages[..messages.len().min(self.max_messages)];
        self.remote
            .set_with_ttl(&Self::key(chat_id), &capped, self.ttl)
            .await
    }

    /// Drop exactly this chat's key, forcing the next read back to the
    /// source of truth.
    pub async fn invalidate(&self, chat_id: i64) -> bool {
        self.remote.delete(&Self::key(chat_id)).await
    }

    /// Snapshot counters.
    pub fn stats(&self) -> RecentMessagesStats {
        let remote = self.remote.stats();
        RecentMessagesStats {
            hits: remote.hits,
            misses: remote.misses,
            hit_rate_percent: remote.hit_rate_percent,
            errors: self.errors.load(Ordering::Relaxed),
            enabled: remote.enabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::CacheBackend;
    use crate::infrastructure::cache::MemoryBackend;

    fn message(text: &str) -> CachedMessage {
        CachedMessage {
            text: text.to_string(),
            bot_id: Some(1),
            created_at: Some("2025-06-01T12:30:00+00:00".to_string()),
            telegram_message_id: None,
        }
    }

    fn with_memory_backend() -> (RecentMessagesCache, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        let remote = Arc::new(RemoteCache::new(
            Some(Arc::clone(&backend) as Arc<dyn CacheBackend>),
            Duration::from_secs(60),
            Duration::from_secs(1),
        ));
        let cache = RecentMessagesCache::new(remote, Duration::from_secs(60), 2).unwrap();
        (cache, backend)
    }

    #[test]
    fn test_rejects_invalid_config() {
        let remote = Arc::new(RemoteCache::disabled());
        assert!(matches!(
            RecentMessagesCache::new(Arc::clone(&remote), Duration::from_secs(60), 0),
            Err(CacheConfigError::InvalidMaxSize)
        ));
        assert!(matches!(
            RecentMessagesCache::new(remote, Duration::ZERO, 5),
            Err(CacheConfigError::InvalidTtl)
        ));
    }

    #[test]
    fn test_key_namespace() {
        assert_eq!(RecentMessagesCache::key(7), "messages:chat_7:recent");
    }

    #[tokio::test]
    async fn test_truncates_to_max_messages() {
        let (cache, _) = with_memory_backend();
        let messages = vec![message("m1"), message("m2"), message("m3")];

        assert!(cache.set(7, &messages).await);
        let cached = cache.get(7).await.unwrap();
        assert_eq!(cached, vec![message("m1"), message("m2")]);
    }

    #[tokio::test]
    async fn test_invalidate_removes_only_that_chat() {
        let (cache, _) = with_memory_backend();
        cache.set(1, &[message("a")]).await;
        cache.set(2, &[message("b")]).await;

        assert!(cache.invalidate(1).await);
        assert_eq!(cache.get(1).await, None);
        assert_eq!(cache.get(2).await, Some(vec![message("b")]));
    }

    #[tokio::test]
    async fn test_backend_error_counts_as_error() {
        let (cache, backend) = with_memory_backend();
        backend.set_failing(true);

        assert_eq!(cache.get(7).await, None);
        let stats = cache.stats();
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_disabled_remote() {
        let remote = Arc::new(RemoteCache::disabled());
        let cache = RecentMessagesCache::new(remote, Duration::from_secs(60), 5).unwrap();

        assert!(!cache.set(7, &[message("m")]).await);
        assert_eq!(cache.get(7).await, None);

        let stats = cache.stats();
        assert!(!stats.enabled);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.errors, 0);
    }
}
