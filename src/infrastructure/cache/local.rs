//! In-process LRU cache with per-entry TTL and hit/miss/eviction accounting.
//!
//! Used to memoize small hot lookups (enabled-bot lists, chat settings)
//! that would otherwise hit the database every tick. TTL is lazy: expired
//! entries are dropped on access, never by a background sweeper, which
//! keeps every operation a short critical section under one lock.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use super::CacheConfigError;

/// Snapshot of [`LocalCache`] counters and occupancy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalCacheStats {
    /// Reads that returned a fresh value
    pub hits: u64,
    /// Reads that found nothing (or an expired entry)
    pub misses: u64,
    /// Capacity-forced removals
    pub evictions: u64,
    /// Current entry count (expired-but-unread entries included)
    pub size: usize,
    /// Configured capacity
    pub max_size: usize,
    /// `100 * hits / (hits + misses)`, rounded to two decimals; 0.0 with no reads
    pub hit_rate_percent: f64,
}

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
    stamp: u64,
}

struct Inner<V> {
    entries: HashMap<String, CacheEntry<V>>,
    /// Recency index: strictly increasing stamp -> key. Smallest stamp is
    /// the least recently used entry.
    recency: BTreeMap<u64, String>,
    next_stamp: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl<V> Inner<V> {
    fn touch(&mut self, key: &str, old_stamp: u64) -> u64 {
        self.recency.remove(&old_stamp);
        let stamp = self.next_stamp;
        self.next_stamp += 1;
        self.recency.insert(stamp, key.to_string());
        stamp
    }

    fn remove(&mut self, key: &str) -> bool {
        if let Some(entry) = self.entries.remove(key) {
            self.recency.remove(&entry.stamp);
            true
        } else {
            false
        }
    }
}

/// Bounded, thread-safe LRU cache with per-entry TTL.
///
/// All operations take `&self` and run under a single internal mutex, so a
/// cache can be shared across workers behind an `Arc`. Stored values are
/// treated as immutable snapshots; reads clone them out.
///
/// # Example
/// ```
/// use chatswarm::infrastructure::cache::LocalCache;
/// use std::time::Duration;
///
/// let cache: LocalCache<Vec<i64>> = LocalCache::new(100, Duration::from_secs(60)).unwrap();
/// cache.set("bots:enabled", vec![1, 2, 3]);
/// assert_eq!(cache.get("bots:enabled"), Some(vec![1, 2, 3]));
/// ```
pub struct LocalCache<V> {
    inner: Mutex<Inner<V>>,
    max_size: usize,
    default_ttl: Duration,
}

impl<V: Clone> LocalCache<V> {
    /// Create a cache holding at most `max_size` entries.
    ///
    /// # Errors
    /// Returns [`CacheConfigError`] if `max_size` is zero or `default_ttl`
    /// is not positive.
    pub fn new(max_size: usize, default_ttl: Duration) -> Result<Self, CacheConfigError> {
        if max_size == 0 {
            return Err(CacheConfigError::InvalidMaxSize);
        }
        if default_ttl.is_zero() {
            return Err(CacheConfigError::InvalidTtl);
        }

        Ok(Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                recency: BTreeMap::new(),
                next_stamp: 0,
                hits: 0,
                misses: 0,
                evictions: 0,
            }),
            max_size,
            default_ttl,
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner<V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read a value, promoting it to most-recently-used on a hit.
    ///
    /// An expired entry behaves as a miss and is removed.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut inner = self.lock();

        let (fresh, old_stamp) = match inner.entries.get(key) {
            None => {
                inner.misses += 1;
                return None;
            }
            Some(entry) => (now <= entry.expires_at, entry.stamp),
        };

        if !fresh {
            inner.remove(key);
            inner.misses += 1;
            return None;
        }

        let stamp = inner.touch(key, old_stamp);
        let entry = inner
            .entries
            .get_mut(key)
            .unwrap_or_else(|| unreachable!("entry checked above"));
        entry.stamp = stamp;
        let value = entry.value.clone();
        inner.hits += 1;
        Some(value)
    }

    /// Insert or overwrite a value with the default TTL.
    pub fn set(&self, key: &str, value: V) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    /// Insert or overwrite a value with an explicit TTL.
    ///
    /// Overwriting an existing key never evicts; inserting a new key at
    /// capacity evicts the least recently used entry first.
    pub fn set_with_ttl(&self, key: &str, value: V, ttl: Duration) {
        let expires_at = Instant::now() + ttl;
        let mut inner = self.lock();

        if let Some(old_stamp) = inner.entries.get(key).map(|entry| entry.stamp) {
            let stamp = inner.touch(key, old_stamp);
            inner.entries.insert(
                key.to_string(),
                CacheEntry { value, expires_at, stamp },
            );
            return;
        }

        if inner.entries.len() >= self.max_size {
            if let Some((_, lru_key)) = inner.recency.pop_first() {
                inner.entries.remove(&lru_key);
                inner.evictions += 1;
            }
        }

        let stamp = inner.next_stamp;
        inner.next_stamp += 1;
        inner.recency.insert(stamp, key.to_string());
        inner.entries.insert(
            key.to_string(),
            CacheEntry { value, expires_at, stamp },
        );
    }

    /// Remove a key, reporting whether it was present. Counters untouched.
    pub fn delete(&self, key: &str) -> bool {
        self.lock().remove(key)
    }

    /// Remove every key starting with `prefix`, returning how many were
    /// removed.
    ///
    /// This is a prefix match, not a glob: the shared tier's
    /// `delete_pattern` uses backend glob syntax instead.
    pub fn delete_pattern(&self, prefix: &str) -> usize {
        let mut inner = self.lock();
        let matching: Vec<String> = inner
            .entries
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();
        for key in &matching {
            inner.remove(key);
        }
        matching.len()
    }

    /// Drop every entry. Counters untouched.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.recency.clear();
    }

    /// Current entry count, expired-but-unread entries included.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot counters and occupancy.
    pub fn stats(&self) -> LocalCacheStats {
        let inner = self.lock();
        LocalCacheStats {
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
            size: inner.entries.len(),
            max_size: self.max_size,
            hit_rate_percent: hit_rate_percent(inner.hits, inner.misses),
        }
    }

    /// Zero the hit/miss/eviction counters. Entries untouched.
    pub fn reset_stats(&self) {
        let mut inner = self.lock();
        inner.hits = 0;
        inner.misses = 0;
        inner.evictions = 0;
    }
}

pub(crate) fn hit_rate_percent(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let rate = 100.0 * hits as f64 / total as f64;
    (rate * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn cache(max_size: usize) -> LocalCache<i64> {
        LocalCache::new(max_size, Duration::from_secs(60)).unwrap()
    }

    #[test]
    fn test_rejects_zero_max_size() {
        let result = LocalCache::<i64>::new(0, Duration::from_secs(60));
        assert!(matches!(result, Err(CacheConfigError::InvalidMaxSize)));
    }

    #[test]
    fn test_rejects_zero_ttl() {
        let result = LocalCache::<i64>::new(10, Duration::ZERO);
        assert!(matches!(result, Err(CacheConfigError::InvalidTtl)));
    }

    #[test]
    fn test_get_miss_then_hit() {
        let c = cache(10);
        assert_eq!(c.get("k"), None);
        c.set("k", 5);
        assert_eq!(c.get("k"), Some(5));

        let stats = c.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate_percent, 50.0);
    }

    #[test]
    fn test_lru_eviction_small_cache() {
        let c = cache(3);
        c.set("a", 1);
        c.set("b", 2);
        c.set("c", 3);
        c.get("a"); // promote "a"; "b" is now LRU
        c.set("d", 4);

        assert_eq!(c.get("b"), None);
        assert_eq!(c.get("a"), Some(1));
        assert_eq!(c.get("c"), Some(3));
        assert_eq!(c.get("d"), Some(4));

        let stats = c.stats();
        assert_eq!(stats.hits, 4);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.size, 3);
    }

    #[test]
    fn test_overwrite_never_evicts() {
        let c = cache(2);
        c.set("a", 1);
        c.set("b", 2);
        c.set("a", 10);

        assert_eq!(c.len(), 2);
        assert_eq!(c.get("a"), Some(10));
        assert_eq!(c.get("b"), Some(2));
        assert_eq!(c.stats().evictions, 0);
    }

    #[test]
    fn test_overwrite_promotes_to_mru() {
        let c = cache(2);
        c.set("a", 1);
        c.set("b", 2);
        c.set("a", 10); // "b" becomes LRU
        c.set("c", 3);

        assert_eq!(c.get("b"), None);
        assert_eq!(c.get("a"), Some(10));
        assert_eq!(c.get("c"), Some(3));
    }

    #[test]
    fn test_ttl_expiry_behaves_as_miss() {
        let c = LocalCache::new(10, Duration::from_millis(30)).unwrap();
        c.set("k", 1);
        thread::sleep(Duration::from_millis(60));

        assert_eq!(c.get("k"), None);
        assert_eq!(c.len(), 0);
        assert_eq!(c.stats().misses, 1);
    }

    #[test]
    fn test_explicit_ttl_overrides_default() {
        let c = LocalCache::new(10, Duration::from_millis(10)).unwrap();
        c.set_with_ttl("k", 1, Duration::from_secs(60));
        thread::sleep(Duration::from_millis(30));
        assert_eq!(c.get("k"), Some(1));
    }

    #[test]
    fn test_delete() {
        let c = cache(10);
        c.set("k", 1);
        assert!(c.delete("k"));
        assert!(!c.delete("k"));
        // delete never touches counters
        assert_eq!(c.stats().hits + c.stats().misses, 0);
    }

    #[test]
    fn test_delete_pattern_is_prefix_match() {
        let c = cache(100);
        c.set("bot:1:a", 1);
        c.set("bot:1:b", 2);
        c.set("bot:2:a", 3);
        c.set("chat:1:a", 4);

        assert_eq!(c.delete_pattern("bot:1:"), 2);
        assert_eq!(c.get("bot:2:a"), Some(3));
        assert_eq!(c.get("chat:1:a"), Some(4));
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn test_clear_keeps_counters() {
        let c = cache(10);
        c.set("k", 1);
        c.get("k");
        c.get("missing");
        c.clear();

        assert!(c.is_empty());
        let stats = c.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_reset_stats_keeps_entries() {
        let c = cache(10);
        c.set("k", 1);
        c.get("k");
        c.reset_stats();

        let stats = c.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.evictions, 0);
        assert_eq!(stats.size, 1);
        assert_eq!(c.get("k"), Some(1));
    }

    #[test]
    fn test_hit_rate_rounding() {
        assert_eq!(hit_rate_percent(0, 0), 0.0);
        assert_eq!(hit_rate_percent(1, 2), 33.33);
        assert_eq!(hit_rate_percent(2, 1), 66.67);
        assert_eq!(hit_rate_percent(3, 0), 100.0);
    }

    #[test]
    fn test_eviction_picks_lru_not_just_read() {
        let c = cache(2);
        c.set("a", 1);
        c.set("b", 2);
        c.get("a"); // "a" is MRU; eviction must pick "b"
        c.set("c", 3);

        assert_eq!(c.get("a"), Some(1));
        assert_eq!(c.get("b"), None);
    }

    #[test]
    fn test_concurrent_access() {
        use std::sync::Arc;

        let c = Arc::new(cache(64));
        let mut handles = Vec::new();
        for t in 0..4 {
            let c = Arc::clone(&c);
            handles.push(thread::spawn(move || {
                for i in 0..200 {
                    let key = format!("worker{t}:key{}", i % 16);
                    c.set(&key, i);
                    c.get(&key);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let stats = c.stats();
        assert!(stats.size <= 64);
        assert_eq!(stats.hits + stats.misses, 800);
    }
}
