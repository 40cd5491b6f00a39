// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use async_trait::async_trait;

use super::entry::CacheEntry;
use crate::error::SyncError;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),
    #[error("cache payload error: {0}")]
    Serialization(String),
}

impl From<CacheError> for SyncError {
    fn from(err: CacheError) -> Self {
        SyncError::Cache(err.to_string())
    }
}

/// TTL-aware key/value backend behind [`CacheLayer`](super::CacheLayer).
///
/// `get` returns logically expired entries too; the layer decides whether an
/// entry is a hit or only usable as a stale fallback. Backends drop entries
/// once they are past expiry plus the stale-retention window.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Backend label for metrics and logs.
    fn backend(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError>;
    async fn put(&self, key: &str, entry: &CacheEntry) -> Result<(), CacheError>;
    /// Returns whether a key was removed.
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;
    /// Delete every key matching a glob (`*`, `?`). Returns the number removed.
    async fn delete_pattern(&self, pattern: &str) -> Result<usize, CacheError>;
    async fn ping(&self) -> Result<(), CacheError>;

    /// Physically remove entries past their retention. Backends with native expiry return 0.
    async fn purge_expired(&self) -> Result<usize, CacheError> {
        Ok(0)
    }
}
