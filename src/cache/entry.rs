// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::model::now_millis;

/// A cached value with its creation time and declared TTL.
///
/// Expiry is logical: an expired entry is no longer a hit, but the store keeps
/// it for the stale-retention window so a failing fetch can fall back to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub value: Value,
    pub created_at_ms: i64,
    pub ttl_ms: u64,
}

impl CacheEntry {
    #[must_use]
    pub fn new(value: Value, ttl: Duration) -> Self {
        Self {
            value,
            created_at_ms: now_millis(),
            ttl_ms: u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX),
        }
    }

    #[must_use]
    pub fn expires_at_ms(&self) -> i64 {
        self.created_at_ms.saturating_add(i64::try_from(self.ttl_ms).unwrap_or(i64::MAX))
    }

    #[must_use]
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        now_ms >= self.expires_at_ms()
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_millis())
    }

    /// Past expiry plus `retention`: eligible for physical removal.
    #[must_use]
    pub fn is_purgeable_at(&self, now_ms: i64, retention: Duration) -> bool {
        let retention_ms = i64::try_from(retention.as_millis()).unwrap_or(i64::MAX);
        now_ms >= self.expires_at_ms().saturating_add(retention_ms)
    }

    #[must_use]
    pub fn age_ms(&self) -> i64 {
        (now_millis() - self.created_at_ms).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_expiry_boundaries() {
        let entry = CacheEntry {
            value: json!([1, 2]),
            created_at_ms: 10_000,
            ttl_ms: 1_000,
        };
        assert!(!entry.is_expired_at(10_999));
        assert!(entry.is_expired_at(11_000));
        assert!(!entry.is_purgeable_at(11_500, Duration::from_secs(1)));
        assert!(entry.is_purgeable_at(12_000, Duration::from_secs(1)));
    }

    #[test]
    fn test_fresh_entry_is_not_expired() {
        let entry = CacheEntry::new(json!({"round": 1}), Duration::from_secs(60));
        assert!(!entry.is_expired());
        assert_eq!(entry.ttl_ms, 60_000);
    }
}
