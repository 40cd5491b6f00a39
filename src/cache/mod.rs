// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Tiered-TTL cache.
//!
//! [`CacheLayer`] owns the read-through / stale-fallback semantics and talks to
//! a [`CacheStore`] backend: [`MemoryCacheStore`] (DashMap, swept by a
//! background task) or [`RedisCacheStore`]. TTLs come from [`TtlPolicy`] by
//! data volatility class.

pub mod entry;
pub mod keys;
pub mod layer;
pub mod memory;
pub mod redis;
pub mod traits;
pub mod ttl;

pub use entry::CacheEntry;
pub use layer::{CacheLayer, CacheStats};
pub use memory::MemoryCacheStore;
pub use redis::RedisCacheStore;
pub use traits::{CacheError, CacheStore};
pub use ttl::{TtlClass, TtlPolicy};
