// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! # Pitwall Sync
//!
//! Resilient ingestion, persistence and tiered caching for Formula 1 statistics.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Upstream Sources                        │
//! │  • Racing statistics API (schedules, results, standings)    │
//! │  • Telemetry API (sessions, car data)                       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!              (retry + backoff + circuit breaker)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Normalizer                           │
//! │  • Typed wire shapes, fail closed on mismatch               │
//! │  • Pure functions, no I/O                                   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!               (bounded-concurrency season sync)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Repository (SQLite / MySQL)                 │
//! │  • Idempotent upserts keyed by natural keys                 │
//! │  • Batched bulk writes, one transaction per batch           │
//! │  • Sync log per run                                         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                    (invalidate on write)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Cache (Redis or in-memory)                 │
//! │  • TTL classes by data volatility                           │
//! │  • Stale-serve when a refresh fails                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pitwall_sync::{F1DataService, PitwallConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), pitwall_sync::SyncError> {
//!     let config = PitwallConfig {
//!         sql_url: Some("sqlite:pitwall.db?mode=rwc".into()),
//!         redis_url: Some("redis://localhost:6379".into()),
//!         ..Default::default()
//!     };
//!
//!     let service = F1DataService::init(config).await?;
//!
//!     let report = service.sync_season("2024").await?;
//!     println!("synced {} of {} races", report.races_synced, report.races_total);
//!
//!     // Cache → repository → upstream
//!     for race in service.races("2024").await? {
//!         println!("{} {}", race.round, race.name);
//!     }
//!
//!     service.close().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`source`]: Upstream HTTP clients and their resilient wrappers
//! - [`resilience`]: Retry with backoff and jitter, circuit breakers
//! - [`normalize`]: Upstream JSON → canonical entities
//! - [`storage`]: Repository trait, SQL and in-memory implementations
//! - [`cache`]: Cache stores, TTL classes and the read-through layer
//! - [`sync`]: The [`SyncOrchestrator`]
//! - [`service`]: [`F1DataService`], the injected read/sync facade
//! - [`api`]: Response envelope and status mapping

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod metrics;
pub mod model;
pub mod normalize;
pub mod resilience;
pub mod service;
pub mod source;
pub mod storage;
pub mod sync;

pub use cache::{CacheLayer, CacheStore, MemoryCacheStore, RedisCacheStore, TtlClass, TtlPolicy};
pub use config::PitwallConfig;
pub use error::{ErrorKind, SyncError};
pub use model::{calculate_completeness, SeasonId};
pub use resilience::circuit_breaker::{
    CircuitBreaker, CircuitConfig, CircuitError, CircuitState, SourceCircuits,
};
pub use resilience::retry::RetryConfig;
pub use service::{F1DataService, HealthReport};
pub use source::{RacingSource, TelemetrySource};
pub use storage::{MemoryRepository, Repository, SqlRepository};
pub use sync::{SeasonSyncReport, SyncOptions, SyncOrchestrator, SyncPhase};
pub use metrics::LatencyTimer;
