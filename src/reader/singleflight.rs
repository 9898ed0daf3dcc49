//! In-flight request deduplication
//!
//! At most one upstream fetch per key: concurrent callers for an identical
//! pending key await one shared future instead of issuing duplicate RPC
//! calls. Dropping one waiter leaves the remaining waiters driving the shared
//! fetch; the fetch itself is only dropped with the last waiter.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;

use futures::future::{BoxFuture, FutureExt, Shared};

use crate::infra::Result;

type SharedFetch<V> = Shared<BoxFuture<'static, Result<V>>>;

/// A per-operation deduplication table.
pub struct Singleflight<K, V>
where
    V: Clone,
{
    inflight: Mutex<HashMap<K, SharedFetch<V>>>,
}

impl<K, V> Default for Singleflight<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Singleflight<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Run `fetch` under the given key, joining an already-pending fetch for
    /// the same key instead of starting a second one.
    pub async fn run<F>(&self, key: K, fetch: F) -> Result<V>
    where
        F: std::future::Future<Output = Result<V>> + Send + 'static,
    {
        let shared = {
            let mut inflight = self.inflight.lock().unwrap_or_else(|e| e.into_inner());
            match inflight.get(&key) {
                Some(existing) => existing.clone(),
                None => {
                    let shared = fetch.boxed().shared();
                    inflight.insert(key.clone(), shared.clone());
                    shared
                }
            }
        };

        let result = shared.clone().await;

        // Clear the slot, but only if it still holds the fetch we awaited; a
        // later fetch for the same key must not be evicted by a slow waiter.
        let mut inflight = self.inflight.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(current) = inflight.get(&key) {
            if Shared::ptr_eq(current, &shared) {
                inflight.remove(&key);
            }
        }

        result
    }

    /// Number of keys currently pending.
    pub fn pending(&self) -> usize {
        self.inflight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}
