// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Upstream data sources.
//!
//! Sources return the raw JSON payload of one endpoint; shaping it into
//! entities is the normalizer's job. Plain clients never retry. Wrap them in
//! [`ResilientRacingSource`] / [`ResilientTelemetrySource`] for retry and
//! circuit breaking.
//!
//! # Trait Hierarchy
//!
//! ```text
//! RacingSource                   TelemetrySource
//! ├── ErgastClient (HTTP)        ├── OpenF1Client (HTTP)
//! └── ResilientRacingSource      └── ResilientTelemetrySource
//! ```

pub mod ergast;
pub mod http;
pub mod openf1;
pub mod resilient;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::SyncError;
use crate::model::{SeasonId, StandingsKind};

pub use ergast::ErgastClient;
pub use http::HttpFetcher;
pub use openf1::OpenF1Client;
pub use resilient::{ResilientRacingSource, ResilientTelemetrySource};

/// Racing statistics API (`/{season}.json`, `/{season}/{round}/results.json`, ...).
#[async_trait]
pub trait RacingSource: Send + Sync {
    async fn fetch_seasons(&self) -> Result<Value, SyncError>;
    async fn fetch_races(&self, season: &SeasonId) -> Result<Value, SyncError>;
    async fn fetch_race_results(&self, season: &SeasonId, round: u32) -> Result<Value, SyncError>;
    async fn fetch_qualifying(&self, season: &SeasonId, round: u32) -> Result<Value, SyncError>;
    /// Every page of the lap-by-lap timings, in offset order.
    async fn fetch_lap_times(&self, season: &SeasonId, round: u32) -> Result<Vec<Value>, SyncError>;
    async fn fetch_drivers(&self, season: &SeasonId) -> Result<Value, SyncError>;
    async fn fetch_constructors(&self, season: &SeasonId) -> Result<Value, SyncError>;
    /// Season-to-date standings, or as of `round` when given.
    async fn fetch_standings(
        &self,
        season: &SeasonId,
        kind: StandingsKind,
        round: Option<u32>,
    ) -> Result<Value, SyncError>;
}

/// Live timing / telemetry API (flat JSON arrays).
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    async fn fetch_sessions(&self, year: i32) -> Result<Value, SyncError>;
    async fn fetch_car_data(
        &self,
        session_key: u64,
        driver_number: u32,
    ) -> Result<Value, SyncError>;
}
