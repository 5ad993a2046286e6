//! Short-lived, size-bounded cache of availability records.
//!
//! Shared by every monitor through one mutex. Entries expire by TTL on read;
//! when full, inserting a new key evicts the entry created first, whether or
//! not it has expired.
//!
//! Overwriting a key that is already cached never evicts another entry, even
//! at capacity: the size does not grow, so nothing has to make room.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use crate::config::CacheConfig;
use crate::domain::AvailabilityRecord;

/// Longest freshness window any entry gets.
const MAX_TTL: Duration = Duration::from_secs(86400);

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub value: AvailabilityRecord,
    pub created_at: Instant,
    pub expires_at: Instant,
    /// Insertion order, breaks ties between equal `created_at`
    seq: u64,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    next_seq: u64,
}

#[derive(Debug)]
pub struct ResponseCache {
    enabled: bool,
    max_size: usize,
    default_ttl: Duration,
    inner: Mutex<CacheInner>,
}

impl ResponseCache {
    pub fn new(enabled: bool, max_size: usize, default_ttl: Duration) -> Self {
        Self {
            enabled: enabled && max_size > 0,
            max_size,
            default_ttl,
            inner: Mutex::new(CacheInner::default()),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(
            config.enable,
            config.max_size,
            Duration::from_secs(config.max_age),
        )
    }

    pub fn disabled() -> Self {
        Self::new(false, 0, Duration::ZERO)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fresh record for `key`, removing it if it has expired.
    pub fn get(&self, key: &str) -> Option<AvailabilityRecord> {
        let mut inner = self.lock();
        let entry = inner.entries.get(key)?;

        if Instant::now() > entry.expires_at {
            tracing::debug!("Cache entry for {} expired", key);
            inner.entries.remove(key);
            return None;
        }

        Some(entry.value.clone())
    }

    /// Store `value` for `ttl`, or the configured max age when `ttl` is `None`.
    pub fn put(&self, key: &str, value: AvailabilityRecord, ttl: Option<Duration>) {
        if !self.enabled {
            return;
        }

        let now = Instant::now();
        let mut inner = self.lock();

        if !inner.entries.contains_key(key) && inner.entries.len() >= self.max_size {
            let oldest = inner
                .entries
                .values()
                .min_by_key(|entry| (entry.created_at, entry.seq))
                .map(|entry| entry.key.clone());
            if let Some(oldest) = oldest {
                tracing::debug!("Cache full, evicting {}", oldest);
                inner.entries.remove(&oldest);
            }
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.entries.insert(
            key.to_string(),
            CacheEntry {
                key: key.to_string(),
                value,
                created_at: now,
                expires_at: now + ttl.unwrap_or(self.default_ttl).min(MAX_TTL),
                seq,
            },
        );
    }

    pub fn remove(&self, key: &str) -> Option<AvailabilityRecord> {
        self.lock().entries.remove(key).map(|entry| entry.value)
    }

    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    /// Number of stored entries, including expired ones not yet read.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().entries.contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    fn record(name: &str) -> AvailabilityRecord {
        AvailabilityRecord::new(name)
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_round_trip() {
        let cache = ResponseCache::new(true, 10, Duration::from_secs(10));
        cache.put("1234567", record("a"), Some(Duration::from_secs(5)));

        assert_eq!(cache.get("1234567").unwrap().name, "a");

        advance(Duration::from_secs(5)).await;
        assert!(cache.get("1234567").is_some());

        advance(Duration::from_millis(1)).await;
        assert!(cache.get("1234567").is_none());
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_ttl_used() {
        let cache = ResponseCache::new(true, 10, Duration::from_secs(2));
        cache.put("k", record("a"), None);
        advance(Duration::from_secs(3)).await;
        assert!(cache.get("k").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_evicts_oldest_created() {
        let cache = ResponseCache::new(true, 3, Duration::from_secs(60));
        for key in ["a", "b", "c"] {
            cache.put(key, record(key), None);
            advance(Duration::from_secs(1)).await;
        }

        cache.put("d", record("d"), None);

        assert_eq!(cache.len(), 3);
        assert!(!cache.contains("a"));
        for key in ["b", "c", "d"] {
            assert!(cache.contains(key), "{key} should survive");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_eviction_ignores_expiry() {
        let cache = ResponseCache::new(true, 2, Duration::from_secs(60));
        cache.put("old", record("old"), Some(Duration::from_secs(600)));
        advance(Duration::from_secs(1)).await;
        cache.put("short", record("short"), Some(Duration::from_millis(1)));
        advance(Duration::from_secs(1)).await;

        cache.put("new", record("new"), None);
        assert!(!cache.contains("old"));
        assert!(cache.contains("short"));
    }

    #[test]
    fn test_same_instant_evicts_first_inserted() {
        let cache = ResponseCache::new(true, 2, Duration::from_secs(60));
        cache.put("first", record("1"), None);
        cache.put("second", record("2"), None);
        cache.put("third", record("3"), None);

        assert!(!cache.contains("first"));
        assert!(cache.contains("second"));
        assert!(cache.contains("third"));
    }

    #[test]
    fn test_overwrite_does_not_evict() {
        let cache = ResponseCache::new(true, 2, Duration::from_secs(60));
        cache.put("a", record("1"), None);
        cache.put("b", record("2"), None);
        cache.put("a", record("3"), None);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a").unwrap().name, "3");
        assert!(cache.contains("b"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_ttl_capped() {
        let cache = ResponseCache::new(true, 10, Duration::MAX);
        cache.put("a", record("1"), None);
        cache.put("b", record("2"), Some(Duration::from_secs(u64::MAX)));

        advance(MAX_TTL).await;
        assert_eq!(cache.get("a").unwrap().name, "1");

        advance(Duration::from_millis(1)).await;
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_none());
    }

    #[test]
    fn test_disabled_cache_is_noop() {
        let cache = ResponseCache::from_config(&CacheConfig {
            enable: false,
            ..CacheConfig::default()
        });
        cache.put("a", record("1"), None);
        assert!(cache.is_empty());
        assert!(cache.get("a").is_none());

        let zero = ResponseCache::new(true, 0, Duration::from_secs(5));
        assert!(!zero.is_enabled());
        zero.put("a", record("1"), None);
        assert!(zero.is_empty());
    }

    #[test]
    fn test_remove_and_clear() {
        let cache = ResponseCache::new(true, 5, Duration::from_secs(60));
        cache.put("a", record("1"), None);
        cache.put("b", record("2"), None);

        assert_eq!(cache.remove("a").unwrap().name, "1");
        assert!(cache.remove("a").is_none());
        cache.clear();
        assert!(cache.is_empty());
    }
}
