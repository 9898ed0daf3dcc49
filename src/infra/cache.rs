//! TTL cache for contract read results
//!
//! Pull-based invalidation only: an expired entry is refetched on the next
//! access, never refreshed in the background. Expired entries are retained
//! until evicted so that an opt-in stale-serving policy can fall back to them
//! when the RPC endpoint fails.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Policy for serving cached data after an upstream failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StalePolicy {
    /// Propagate the upstream failure (default)
    #[default]
    FailClosed,
    /// Serve a stale-but-present entry, flagged as stale
    ServeStale,
}

/// A capacity-bounded cache with TTL and least-recently-accessed eviction.
pub struct TtlCache<K, V> {
    max_entries: usize,
    ttl: Duration,
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
    stats: CacheStats,
}

struct CacheEntry<V> {
    value: V,
    fetched_at: Instant,
    last_accessed: Instant,
}

/// Cache statistics
#[derive(Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    stale_serves: AtomicU64,
}

impl CacheStats {
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    pub fn stale_serves(&self) -> u64 {
        self.stale_serves.load(Ordering::Relaxed)
    }

    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits() as f64;
        let total = hits + self.misses() as f64;
        if total > 0.0 {
            hits / total
        } else {
            0.0
        }
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a new cache.
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            max_entries,
            ttl,
            entries: RwLock::new(HashMap::new()),
            stats: CacheStats::default(),
        }
    }

    /// Get a fresh value. Expired entries count as misses but are kept in
    /// place for [`TtlCache::get_stale`].
    pub async fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.write().await;

        if let Some(entry) = entries.get_mut(key) {
            if entry.fetched_at.elapsed() <= self.ttl {
                entry.last_accessed = Instant::now();
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.value.clone());
            }
        }

        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Get a value regardless of freshness. Used only by the stale-serving
    /// failure path; records a stale serve when the entry is past its TTL.
    pub async fn get_stale(&self, key: &K) -> Option<V> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        if entry.fetched_at.elapsed() > self.ttl {
            self.stats.stale_serves.fetch_add(1, Ordering::Relaxed);
        }
        Some(entry.value.clone())
    }

    /// Insert a value, evicting the least-recently-accessed entry at capacity.
    pub async fn insert(&self, key: K, value: V) {
        let mut entries = self.entries.write().await;

        if entries.len() >= self.max_entries && !entries.contains_key(&key) {
            if let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, e)| e.last_accessed)
                .map(|(k, _)| k.clone())
            {
                entries.remove(&oldest);
                self.stats.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }

        let now = Instant::now();
        entries.insert(
            key,
            CacheEntry {
                value,
                fetched_at: now,
                last_accessed: now,
            },
        );
    }

    /// Remove a single entry.
    pub async fn invalidate(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.write().await;
        entries.remove(key).map(|e| e.value)
    }

    /// Remove all entries.
    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        entries.clear();
    }

    /// Number of entries, fresh or stale.
    pub async fn len(&self) -> usize {
        let entries = self.entries.read().await;
        entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Statistics as JSON, for the `/stats` endpoint.
    pub fn stats_json(&self) -> serde_json::Value {
        serde_json::json!({
            "hits": self.stats.hits(),
            "misses": self.stats.misses(),
            "hit_rate": self.stats.hit_rate(),
            "evictions": self.stats.evictions(),
            "stale_serves": self.stats.stale_serves(),
        })
    }
}
