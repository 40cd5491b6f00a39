// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

use super::entry::CacheEntry;
use super::traits::{CacheError, CacheStore};
use crate::model::now_millis;

/// In-process cache store.
pub struct MemoryCacheStore {
    entries: DashMap<String, CacheEntry>,
    stale_retention: Duration,
}

impl MemoryCacheStore {
    #[must_use]
    pub fn new(stale_retention: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            stale_retention,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    fn purge_now(&self) -> usize {
        let now = now_millis();
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| !entry.is_purgeable_at(now, self.stale_retention));
        before.saturating_sub(self.entries.len())
    }

    /// Periodically drop entries past their retention window.
    pub fn spawn_sweeper(store: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every.max(Duration::from_millis(10)));
            // First tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = store.purge_now();
                if removed > 0 {
                    debug!(removed, remaining = store.len(), "Swept expired cache entries");
                    crate::metrics::record_cache_evictions("expired", removed);
                }
                crate::metrics::set_cache_entries(store.len());
            }
        })
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(7 * 24 * 3600))
    }
}

/// Glob match with `*` (any run), `?` (one char) and `\` escapes.
pub(crate) fn glob_match(pattern: &str, key: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let k: Vec<char> = key.chars().collect();
    let (mut pi, mut ki) = (0usize, 0usize);
    let mut backtrack: Option<(usize, usize)> = None;

    while ki < k.len() {
        match p.get(pi) {
            Some('*') => {
                backtrack = Some((pi, ki));
                pi += 1;
                continue;
            }
            Some('?') => {
                pi += 1;
                ki += 1;
                continue;
            }
            Some('\\') if p.get(pi + 1) == Some(&k[ki]) => {
                pi += 2;
                ki += 1;
                continue;
            }
            Some(&c) if c != '\\' && c == k[ki] => {
                pi += 1;
                ki += 1;
                continue;
            }
            _ => {}
        }
        match backtrack {
            Some((star, matched)) => {
                pi = star + 1;
                ki = matched + 1;
                backtrack = Some((star, matched + 1));
            }
            None => return false,
        }
    }
    p[pi..].iter().all(|&c| c == '*')
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let now = now_millis();
        let entry = match self.entries.get(key) {
            Some(e) => e.value().clone(),
            None => return Ok(None),
        };
        if entry.is_purgeable_at(now, self.stale_retention) {
            self.entries.remove(key);
            return Ok(None);
        }
        Ok(Some(entry))
    }

    async fn put(&self, key: &str, entry: &CacheEntry) -> Result<(), CacheError> {
        self.entries.insert(key.to_string(), entry.clone());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.entries.remove(key).is_some())
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<usize, CacheError> {
        let before = self.entries.len();
        self.entries.retain(|key, _| !glob_match(pattern, key));
        Ok(before.saturating_sub(self.entries.len()))
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize, CacheError> {
        Ok(self.purge_now())
    }
}
