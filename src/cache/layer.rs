// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Read-through cache with stale fallback.
//!
//! ```text
//! get_or_set(key, ttl, fetch)
//!   ├── fresh entry ──────────────────────────► hit
//!   └── miss / expired ─► fetch()
//!         ├── Ok(v) ─► spawn put(key, v) ─────► v
//!         └── Err(e)
//!               ├── prior entry (any age) ────► stale value (warn)
//!               └── none ─────────────────────► Err(e)
//! ```
//!
//! Backend failures never reach the caller: a failed lookup is a miss and a
//! failed write is logged. Concurrent misses for one key may each call the
//! fetcher; the resulting writes are idempotent.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::entry::CacheEntry;
use super::traits::CacheStore;
use super::ttl::TtlPolicy;
use crate::error::{ErrorKind, SyncError};

/// Point-in-time counters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub stale_serves: u64,
    pub errors: u64,
}

impl CacheStats {
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    stale: AtomicU64,
    errors: AtomicU64,
}

pub struct CacheLayer {
    store: Arc<dyn CacheStore>,
    policy: TtlPolicy,
    counters: Arc<Counters>,
}

impl CacheLayer {
    pub fn new(store: Arc<dyn CacheStore>, policy: TtlPolicy) -> Self {
        Self {
            store,
            policy,
            counters: Arc::new(Counters::default()),
        }
    }

    #[must_use]
    pub fn policy(&self) -> &TtlPolicy {
        &self.policy
    }

    #[must_use]
    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            stale_serves: self.counters.stale.load(Ordering::Relaxed),
            errors: self.counters.errors.load(Ordering::Relaxed),
        }
    }

    fn backend_error(&self, operation: &str, key: &str, err: &dyn std::fmt::Display) {
        self.counters.errors.fetch_add(1, Ordering::Relaxed);
        crate::metrics::record_cache_error(self.store.backend(), operation);
        warn!(backend = self.store.backend(), operation, key, error = %err, "Cache backend error, treating as miss");
    }

    /// Raw entry regardless of age; backend errors become `None`.
    async fn lookup(&self, key: &str) -> Option<CacheEntry> {
        match self.store.get(key).await {
            Ok(entry) => entry,
            Err(e) => {
                self.backend_error("get", key, &e);
                None
            }
        }
    }

    fn decode<T: DeserializeOwned>(&self, key: &str, entry: &CacheEntry) -> Option<T> {
        match serde_json::from_value(entry.value.clone()) {
            Ok(v) => Some(v),
            Err(e) => {
                self.backend_error("decode", key, &e);
                None
            }
        }
    }

    fn record_hit(&self) {
        self.counters.hits.fetch_add(1, Ordering::Relaxed);
        crate::metrics::record_cache_lookup(self.store.backend(), "hit");
    }

    fn record_miss(&self) {
        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        crate::metrics::record_cache_lookup(self.store.backend(), "miss");
    }

    /// Fresh value for `key`, or `None` when absent, expired or unreadable.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self
            .lookup(key)
            .await
            .filter(|entry| !entry.is_expired())
            .and_then(|entry| self.decode(key, &entry));
        match value {
            Some(v) => {
                self.record_hit();
                Some(v)
            }
            None => {
                self.record_miss();
                None
            }
        }
    }

    /// Write through to the store, awaiting the backend.
    pub async fn set<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<(), SyncError> {
        let value = serde_json::to_value(value).map_err(|e| SyncError::Cache(e.to_string()))?;
        self.store.put(key, &CacheEntry::new(value, ttl)).await.map_err(|e| {
            self.backend_error("put", key, &e);
            SyncError::from(e)
        })
    }

    /// Return the cached value, or fetch it and populate the cache in the background.
    ///
    /// When the fetch fails and any earlier value for `key` is still retained,
    /// that value is returned instead of the error. Validation errors are
    /// always propagated.
    pub async fn get_or_set<T, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        fetch: F,
    ) -> Result<T, SyncError>
    where
        T: Serialize + DeserializeOwned + Send,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, SyncError>> + Send,
    {
        let prior = self.lookup(key).await;
        if let Some(entry) = prior.as_ref().filter(|e| !e.is_expired()) {
            if let Some(v) = self.decode(key, entry) {
                self.record_hit();
                return Ok(v);
            }
        }
        self.record_miss();

        match fetch().await {
            Ok(value) => {
                self.populate(key, &value, ttl);
                Ok(value)
            }
            Err(err) if err.kind() == ErrorKind::Validation => Err(err),
            Err(err) => {
                let stale = prior
                    .as_ref()
                    .and_then(|entry| self.decode::<T>(key, entry).map(|v| (v, entry.age_ms())));
                match stale {
                    Some((value, age_ms)) => {
                        self.counters.stale.fetch_add(1, Ordering::Relaxed);
                        crate::metrics::record_cache_lookup(self.store.backend(), "stale");
                        warn!(key, age_ms, error = %err, "Fetch failed, serving stale cache entry");
                        Ok(value)
                    }
                    None => Err(err),
                }
            }
        }
    }

    /// Fire-and-forget write; the read path never waits on the backend.
    fn populate<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let value = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(e) => {
                self.backend_error("encode", key, &e);
                return;
            }
        };
        let store = self.store.clone();
        let counters = self.counters.clone();
        let key = key.to_string();
        tokio::spawn(async move {
            if let Err(e) = store.put(&key, &CacheEntry::new(value, ttl)).await {
                counters.errors.fetch_add(1, Ordering::Relaxed);
                crate::metrics::record_cache_error(store.backend(), "put");
                warn!(backend = store.backend(), key = %key, error = %e, "Background cache write failed");
            }
        });
    }

    pub async fn delete(&self, key: &str) -> bool {
        match self.store.delete(key).await {
            Ok(removed) => removed,
            Err(e) => {
                self.backend_error("delete", key, &e);
                false
            }
        }
    }

    /// Delete every key matching `pattern`. Returns the number of keys removed.
    pub async fn invalidate_pattern(&self, pattern: &str) -> usize {
        match self.store.delete_pattern(pattern).await {
            Ok(removed) => {
                debug!(pattern, removed, "Invalidated cache keys");
                crate::metrics::record_cache_evictions("invalidated", removed);
                removed
            }
            Err(e) => {
                self.backend_error("delete_pattern", pattern, &e);
                0
            }
        }
    }

    pub async fn invalidate_all(&self, patterns: &[String]) -> usize {
        let mut removed = 0;
        for pattern in patterns {
            removed += self.invalidate_pattern(pattern).await;
        }
        removed
    }

    pub async fn ping(&self) -> Result<(), SyncError> {
        self.store.ping().await.map_err(SyncError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::memory::MemoryCacheStore;
    use crate::cache::traits::CacheError;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    fn layer() -> (Arc<MemoryCacheStore>, CacheLayer) {
        let store = Arc::new(MemoryCacheStore::new(Duration::from_secs(60)));
        (store.clone(), CacheLayer::new(store, TtlPolicy::default()))
    }

    async fn eventually_cached(layer: &CacheLayer, key: &str) -> Option<Vec<u32>> {
        for _ in 0..100 {
            if let Some(v) = layer.get::<Vec<u32>>(key).await {
                return Some(v);
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        None
    }

    #[tokio::test]
    async fn test_value_expires_after_ttl() {
        let (_, layer) = layer();
        layer.set("k", &vec![1u32], Duration::from_secs(1)).await.unwrap();
        assert_eq!(layer.get::<Vec<u32>>("k").await, Some(vec![1]));

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(layer.get::<Vec<u32>>("k").await, None);
    }

    #[tokio::test]
    async fn test_miss_populates_in_background() {
        let (_, layer) = layer();
        let calls = AtomicUsize::new(0);
        let v: Vec<u32> = layer
            .get_or_set("races:2024", Duration::from_secs(60), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(vec![1, 2, 3])
            })
            .await
            .unwrap();
        assert_eq!(v, vec![1, 2, 3]);
        assert_eq!(eventually_cached(&layer, "races:2024").await, Some(vec![1, 2, 3]));

        let again: Vec<u32> = layer
            .get_or_set("races:2024", Duration::from_secs(60), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(vec![9])
            })
            .await
            .unwrap();
        assert_eq!(again, vec![1, 2, 3]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(layer.stats().hits >= 1);
    }

    #[tokio::test]
    async fn test_stale_value_served_when_fetch_fails() {
        let (store, layer) = layer();
        let expired = CacheEntry {
            value: serde_json::json!([7, 8]),
            created_at_ms: crate::model::now_millis() - 10_000,
            ttl_ms: 1_000,
        };
        store.put("standings:2023:driver", &expired).await.unwrap();

        let v: Vec<u32> = layer
            .get_or_set("standings:2023:driver", Duration::from_secs(60), || async {
                Err(SyncError::SourceUnavailable("503".into()))
            })
            .await
            .unwrap();
        assert_eq!(v, vec![7, 8]);
        assert_eq!(layer.stats().stale_serves, 1);
    }

    #[tokio::test]
    async fn test_error_propagates_without_prior_value() {
        let (_, layer) = layer();
        let err = layer
            .get_or_set::<Vec<u32>, _, _>("nothing", Duration::from_secs(60), || async {
                Err(SyncError::CircuitOpen { circuit: "racing_api".into() })
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CircuitOpen);
    }

    #[tokio::test]
    async fn test_validation_error_never_masked() {
        let (_, layer) = layer();
        layer.set("races:2024", &vec![1u32], Duration::ZERO).await.unwrap();
        let err = layer
            .get_or_set::<Vec<u32>, _, _>("races:2024", Duration::from_secs(60), || async {
                Err(SyncError::validation("bad", "x"))
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_invalidate_pattern() {
        let (_, layer) = layer();
        for round in 1..=3u32 {
            let key = crate::cache::keys::race(&crate::model::SeasonId::from_year(2024), round);
            layer.set(&key, &vec![round], Duration::from_secs(60)).await.unwrap();
        }
        layer.set("races:2023:1", &vec![0u32], Duration::from_secs(60)).await.unwrap();
        assert_eq!(layer.invalidate_pattern("races:2024:*").await, 3);
        assert!(layer.get::<Vec<u32>>("races:2023:1").await.is_some());
        assert!(layer.delete("races:2023:1").await);
    }

    struct BrokenStore;

    #[async_trait]
    impl CacheStore for BrokenStore {
        fn backend(&self) -> &'static str {
            "broken"
        }
        async fn get(&self, _: &str) -> Result<Option<CacheEntry>, CacheError> {
            Err(CacheError::Backend("connection refused".into()))
        }
        async fn put(&self, _: &str, _: &CacheEntry) -> Result<(), CacheError> {
            Err(CacheError::Backend("connection refused".into()))
        }
        async fn delete(&self, _: &str) -> Result<bool, CacheError> {
            Err(CacheError::Backend("connection refused".into()))
        }
        async fn delete_pattern(&self, _: &str) -> Result<usize, CacheError> {
            Err(CacheError::Backend("connection refused".into()))
        }
        async fn ping(&self) -> Result<(), CacheError> {
            Err(CacheError::Backend("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn test_backend_errors_downgrade_to_miss() {
        let layer = CacheLayer::new(Arc::new(BrokenStore), TtlPolicy::default());
        let v: Vec<u32> = layer
            .get_or_set("k", Duration::from_secs(1), || async { Ok(vec![5]) })
            .await
            .unwrap();
        assert_eq!(v, vec![5]);
        assert_eq!(layer.invalidate_pattern("*").await, 0);
        assert!(layer.get::<Vec<u32>>("k").await.is_none());
        assert!(layer.stats().errors >= 2);
        assert_eq!(layer.ping().await.unwrap_err().kind(), ErrorKind::Cache);
    }

    #[test]
    fn test_hit_rate() {
        let stats = CacheStats { hits: 3, misses: 1, ..CacheStats::default() };
        assert_eq!(stats.hit_rate(), 0.75);
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }
}
