// Response cache sitting between the service and the upstream provider.
// The store is injected so tests can mock it and production can swap in a
// distributed store; entries live in namespaces ("flight", "price",
// "booking") and expire on their TTL.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::CacheConfig;
use crate::error::FlightServiceError;

/// Key-value store with namespaced string entries and optional per-entry TTL.
#[async_trait]
pub trait CacheStore: Send + Sync + 'static {
    async fn get(&self, namespace: &str, key: &str) -> Option<String>;

    /// `ttl: None` uses the store's configured default.
    async fn set(&self, namespace: &str, key: &str, value: String, ttl: Option<Duration>);

    /// Returns true if an entry was removed.
    async fn delete(&self, namespace: &str, key: &str) -> bool;
}

#[derive(Debug, Default)]
struct CacheStats {
    hit_count: AtomicUsize,
    miss_count: AtomicUsize,
    expired_count: AtomicUsize,
    eviction_count: AtomicUsize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStatsReport {
    pub items_count: usize,
    pub hit_count: usize,
    pub miss_count: usize,
    pub expired_count: usize,
    pub eviction_count: usize,
}

struct CacheEntry {
    value: String,
    created_at: Instant,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// In-process store backed by a concurrent map. Expired entries are dropped
/// lazily on read; when the item cap is reached the oldest entry is evicted.
pub struct InMemoryCache {
    entries: DashMap<String, CacheEntry>,
    config: CacheConfig,
    stats: CacheStats,
}

impl InMemoryCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
            stats: CacheStats::default(),
        }
    }

    pub fn stats(&self) -> CacheStatsReport {
        CacheStatsReport {
            items_count: self.entries.len(),
            hit_count: self.stats.hit_count.load(Ordering::SeqCst),
            miss_count: self.stats.miss_count.load(Ordering::SeqCst),
            expired_count: self.stats.expired_count.load(Ordering::SeqCst),
            eviction_count: self.stats.eviction_count.load(Ordering::SeqCst),
        }
    }

    fn full_key(namespace: &str, key: &str) -> String {
        format!("{namespace}:{key}")
    }

    fn evict_oldest(&self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.value().created_at)
            .map(|entry| entry.key().clone());

        if let Some(key) = oldest {
            if self.entries.remove(&key).is_some() {
                self.stats.eviction_count.fetch_add(1, Ordering::SeqCst);
            }
        }
    }
}

#[async_trait]
impl CacheStore for InMemoryCache {
    async fn get(&self, namespace: &str, key: &str) -> Option<String> {
        let full_key = Self::full_key(namespace, key);

        if let Some(entry) = self.entries.get(&full_key) {
            if !entry.is_expired() {
                self.stats.hit_count.fetch_add(1, Ordering::SeqCst);
                return Some(entry.value.clone());
            }
            drop(entry);
            self.entries.remove(&full_key);
            self.stats.expired_count.fetch_add(1, Ordering::SeqCst);
        }

        self.stats.miss_count.fetch_add(1, Ordering::SeqCst);
        None
    }

    async fn set(&self, namespace: &str, key: &str, value: String, ttl: Option<Duration>) {
        let full_key = Self::full_key(namespace, key);

        if !self.entries.contains_key(&full_key) && self.entries.len() >= self.config.max_items {
            self.evict_oldest();
        }

        let now = Instant::now();
        let ttl = ttl.unwrap_or(self.config.default_ttl);
        self.entries.insert(
            full_key,
            CacheEntry {
                value,
                created_at: now,
                expires_at: now + ttl,
            },
        );
    }

    async fn delete(&self, namespace: &str, key: &str) -> bool {
        self.entries
            .remove(&Self::full_key(namespace, key))
            .is_some()
    }
}

/// Cache-augmented lookup: return the cached value for `(namespace, key)` if
/// present, otherwise run `compute`, store its result, and return it.
///
/// A failed `compute` propagates to the caller and leaves the cache
/// untouched. Concurrent misses on the same key each call upstream and each
/// write the cache; the last write wins.
pub async fn lookup<T, F, Fut>(
    store: &dyn CacheStore,
    namespace: &str,
    key: &str,
    ttl: Option<Duration>,
    compute: F,
) -> Result<T, FlightServiceError>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, FlightServiceError>>,
{
    if let Some(cached) = store.get(namespace, key).await {
        tracing::debug!(namespace, key, "cache hit");
        return serde_json::from_str(&cached).map_err(|e| {
            FlightServiceError::CacheDeserialization {
                namespace: namespace.to_string(),
                key: key.to_string(),
                message: e.to_string(),
            }
        });
    }

    tracing::debug!(namespace, key, "cache miss, calling upstream");
    let fresh = compute().await?;

    match serde_json::to_string(&fresh) {
        Ok(serialized) => store.set(namespace, key, serialized, ttl).await,
        // Not storable is not fatal; the caller still gets the fresh value.
        Err(e) => tracing::error!(namespace, key, error = %e, "failed to serialize cache value"),
    }

    Ok(fresh)
}
