// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Redis cache store.
//!
//! Entries are JSON strings written with `SET ... PX`, where the physical
//! expiry is the entry TTL plus the stale-retention window. Pattern deletes
//! walk the keyspace with `SCAN MATCH` (never `KEYS`) and delete in chunks.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::time::Duration;

use super::entry::CacheEntry;
use super::traits::{CacheError, CacheStore};
use crate::resilience::retry::{retry, RetryConfig};

const SCAN_COUNT: usize = 100;

pub struct RedisCacheStore {
    connection: ConnectionManager,
    /// Key namespace, e.g. `pitwall:` → `pitwall:races:2024`
    prefix: String,
    stale_retention: Duration,
}

impl RedisCacheStore {
    pub async fn new(
        connection_string: &str,
        prefix: &str,
        stale_retention: Duration,
    ) -> Result<Self, CacheError> {
        let client =
            Client::open(connection_string).map_err(|e| CacheError::Backend(e.to_string()))?;

        // Use startup config: fast-fail, don't hang forever
        let connection = retry("redis_connect", &RetryConfig::startup(), || async {
            ConnectionManager::new(client.clone()).await
        })
        .await
        .map_err(|e: redis::RedisError| CacheError::Backend(e.to_string()))?;

        Ok(Self {
            connection,
            prefix: prefix.to_string(),
            stale_retention,
        })
    }

    #[inline]
    fn prefixed_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn physical_ttl_ms(&self, entry: &CacheEntry) -> u64 {
        let retention = u64::try_from(self.stale_retention.as_millis()).unwrap_or(u64::MAX);
        entry.ttl_ms.saturating_add(retention).max(1)
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        let mut conn = self.connection.clone();
        let mut keys = Vec::new();
        let mut cursor = 0u64;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await
                .map_err(|e| CacheError::Backend(format!("Failed to scan cache keys: {}", e)))?;
            keys.extend(batch);
            cursor = next;
            if cursor == 0 {
                break;
            }
        }
        Ok(keys)
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    fn backend(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let conn = self.connection.clone();
        let prefixed = self.prefixed_key(key);

        let raw: Option<String> = retry("redis_get", &RetryConfig::query(), || {
            let mut conn = conn.clone();
            let key = prefixed.clone();
            async move { conn.get(&key).await }
        })
        .await
        .map_err(|e: redis::RedisError| CacheError::Backend(e.to_string()))?;

        raw.map(|s| serde_json::from_str(&s).map_err(|e| CacheError::Serialization(e.to_string())))
            .transpose()
    }

    async fn put(&self, key: &str, entry: &CacheEntry) -> Result<(), CacheError> {
        let conn = self.connection.clone();
        let prefixed = self.prefixed_key(key);
        let payload =
            serde_json::to_string(entry).map_err(|e| CacheError::Serialization(e.to_string()))?;
        let ttl_ms = self.physical_ttl_ms(entry);

        retry("redis_set", &RetryConfig::query(), || {
            let mut conn = conn.clone();
            let key = prefixed.clone();
            let payload = payload.clone();
            async move {
                let _: () = redis::cmd("SET")
                    .arg(&key)
                    .arg(&payload)
                    .arg("PX")
                    .arg(ttl_ms)
                    .query_async(&mut conn)
                    .await?;
                Ok(())
            }
        })
        .await
        .map_err(|e: redis::RedisError| CacheError::Backend(e.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let conn = self.connection.clone();
        let prefixed = self.prefixed_key(key);

        retry("redis_delete", &RetryConfig::query(), || {
            let mut conn = conn.clone();
            let key = prefixed.clone();
            async move {
                let removed: u64 = conn.del(&key).await?;
                Ok(removed > 0)
            }
        })
        .await
        .map_err(|e: redis::RedisError| CacheError::Backend(e.to_string()))
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<usize, CacheError> {
        let keys = self.scan(&self.prefixed_key(pattern)).await?;
        let mut removed = 0usize;
        for chunk in keys.chunks(SCAN_COUNT) {
            let mut conn = self.connection.clone();
            let n: u64 = conn
                .del(chunk)
                .await
                .map_err(|e| CacheError::Backend(e.to_string()))?;
            removed += n as usize;
        }
        Ok(removed)
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.connection.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        Ok(())
    }
}
