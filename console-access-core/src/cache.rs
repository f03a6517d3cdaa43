use lru::LruCache;
use serde_json::Value;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

const MIN_CAPACITY: NonZeroUsize = NonZeroUsize::MIN;

/// Cache key of the form `<purpose>_-_<region>__<guid>`.
pub fn cache_key(purpose: &str, region: &str, guid: &str) -> String {
    format!("{purpose}_-_{region}__{guid}")
}

#[derive(Clone, Debug)]
struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// In-memory LRU map whose entries expire individually.
///
/// Expired entries are purged lazily on read; there is no background sweeper.
pub struct TtlCache<K: Hash + Eq, V> {
    inner: LruCache<K, Entry<V>>,
}

impl<K: Hash + Eq + Clone, V: Clone> TtlCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        let size = NonZeroUsize::new(capacity).unwrap_or(MIN_CAPACITY);
        Self {
            inner: LruCache::new(size),
        }
    }

    pub fn get(&mut self, key: &K) -> Option<V> {
        self.get_with_now(key, Instant::now())
    }

    pub fn insert(&mut self, key: K, value: V, ttl: Duration) {
        self.insert_with_now(key, value, ttl, Instant::now());
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.inner.pop(key).map(|entry| entry.value)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub(crate) fn get_with_now(&mut self, key: &K, now: Instant) -> Option<V> {
        self.purge_expired(now);
        self.inner.get(key).map(|entry| entry.value.clone())
    }

    pub(crate) fn insert_with_now(&mut self, key: K, value: V, ttl: Duration, now: Instant) {
        let entry = Entry {
            value,
            expires_at: now + ttl,
        };
        self.inner.put(key, entry);
    }

    fn purge_expired(&mut self, now: Instant) {
        let expired: Vec<K> = self
            .inner
            .iter()
            .filter(|(_, entry)| entry.expires_at <= now)
            .map(|(key, _)| key.clone())
            .collect();

        for key in expired {
            self.inner.pop(&key);
        }
    }
}

/// Key/value store with per-entry TTL used for resolved access details.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    fn put(&self, key: &str, value: Value, ttl: Duration);
    fn remove(&self, key: &str);
}

/// Process-local [`CacheStore`].
pub struct MemoryCacheStore {
    inner: Mutex<TtlCache<String, Value>>,
}

impl MemoryCacheStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(TtlCache::new(capacity)),
        }
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl CacheStore for MemoryCacheStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key.to_string())
    }

    fn put(&self, key: &str, value: Value, ttl: Duration) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value, ttl);
    }

    fn remove(&self, key: &str) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key.to_string());
    }
}
