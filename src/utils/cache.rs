//! Caching utilities for ytfetch

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// In-memory cache with per-entry TTL and an opportunistic sweep.
///
/// Expired entries are dropped on access; a full sweep of the map runs at
/// most once per `sweep_interval`, piggybacked on inserts.
#[derive(Clone)]
pub struct MemoryCache<K, V> {
    inner: Arc<Mutex<CacheInner<K, V>>>,
    ttl: Duration,
    sweep_interval: Duration,
}

struct CacheInner<K, V> {
    entries: HashMap<K, CachedValue<V>>,
    last_sweep: Instant,
}

#[derive(Clone)]
struct CachedValue<V> {
    value: V,
    expires_at: Instant,
}

impl<K, V> MemoryCache<K, V>
where
    K: std::hash::Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create a cache whose entries live for `ttl`, swept every
    /// `sweep_interval`.
    pub fn new(ttl: Duration, sweep_interval: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CacheInner {
                entries: HashMap::new(),
                last_sweep: Instant::now(),
            })),
            ttl,
            sweep_interval,
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(cached) = inner.entries.get(key) {
            if cached.expires_at > Instant::now() {
                return Some(cached.value.clone());
            }
            inner.entries.remove(key);
        }
        None
    }

    pub fn insert(&self, key: K, value: V) {
        let mut inner = self.inner.lock().unwrap();
        let now = Instant::now();

        if now.duration_since(inner.last_sweep) >= self.sweep_interval {
            inner.entries.retain(|_, cached| cached.expires_at > now);
            inner.last_sweep = now;
        }

        inner.entries.insert(
            key,
            CachedValue {
                value,
                expires_at: now + self.ttl,
            },
        );
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        let mut inner = self.inner.lock().unwrap();
        inner.entries.remove(key).map(|cached| cached.value)
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.entries.clear();
    }

    /// Number of entries currently stored, expired or not.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
