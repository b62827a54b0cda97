//! In-process [`CacheBackend`] used by tests and single-node runs.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::domain::ports::{CacheBackend, CacheBackendError};

struct StoredEntry {
    value: Vec<u8>,
    expires_at: Instant,
}

/// A [`CacheBackend`] backed by a process-local map.
///
/// Honors the same contract as the Redis adapter: per-entry expiry,
/// `*`-glob scans, batch deletes. Also exposes a failure toggle so tests
/// can exercise the absorb-and-degrade paths of the tiers above.
#[derive(Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, StoredEntry>>,
    failing: AtomicBool,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail with
    /// [`CacheBackendError::Unavailable`] until toggled back off.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), CacheBackendError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(CacheBackendError::Unavailable(
                "simulated backend outage".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheBackendError> {
        self.check_available()?;
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        match entries.get(key) {
            Some(entry) if now > entry.expires_at => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn set_ex(
        &self,
        key: &str,
        ttl: Duration,
        value: &[u8],
    ) -> Result<(), CacheBackendError> {
        self.check_available()?;
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            StoredEntry {
                value: value.to_vec(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<u64, CacheBackendError> {
        self.check_available()?;
        let mut entries = self.entries.write().await;
        let mut removed = 0;
        for key in keys {
            if entries.remove(key).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn scan_match(&self, pattern: &str) -> Result<Vec<String>, CacheBackendError> {
        self.check_available()?;
        let now = Instant::now();
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|(key, entry)| now <= entry.expires_at && glob_match(pattern, key))
            .map(|(key, _)| key.clone())
            .collect())
    }

    async fn flush_all(&self) -> Result<(), CacheBackendError> {
        self.check_available()?;
        self.entries.write().await.clear();
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheBackendError> {
        self.check_available()
    }
}

/// Match a key against a glob pattern supporting the `*` wildcard.
fn glob_match(pattern: &str, key: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == key;
    }

    let parts: Vec<&str> = pattern.split('*').collect();
    let mut rest = key;
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if i == 0 {
            match rest.strip_prefix(part) {
                Some(tail) => rest = tail,
                None => return false,
            }
        } else if i == parts.len() - 1 {
            return rest.ends_with(part);
        } else {
            match rest.find(part) {
                Some(pos) => rest = &rest[pos + part.len()..],
                None => return false,
            }
        }
    }
    true
}
