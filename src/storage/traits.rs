// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use async_trait::async_trait;

use crate::error::SyncError;
use crate::model::{
    Circuit, Constructor, ConstructorStanding, Driver, DriverStanding, LapTime, QualifyingResult,
    Race, RaceResult, Season, SeasonId, SyncLog, SyncOutcome,
};

/// Rows per statement inside a batch transaction.
/// MySQL max_allowed_packet is typically 16MB, so chunk into ~500 row statements.
pub const STATEMENT_CHUNK: usize = 500;

/// Result of a bulk write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkWriteReport {
    /// Rows submitted and committed
    pub rows: usize,
    /// Transactions committed
    pub batches: usize,
}

impl BulkWriteReport {
    #[must_use]
    pub fn single(rows: usize) -> Self {
        Self { rows, batches: usize::from(rows > 0) }
    }
}

/// Relational store for canonical entities.
///
/// Every write is an upsert keyed by the entity's natural key, so replaying a
/// sync is idempotent. Identity columns are never rewritten on conflict:
/// circuits are insert-or-ignore, races keep `completed` once reached, and
/// active flags only ever turn on.
///
/// Bulk writes of high-volume rows ([`insert_lap_times`](Self::insert_lap_times))
/// commit one transaction per `batch_size` rows. A failing batch is rolled
/// back and reported; batches committed before it stay committed.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Cheap liveness probe used by health checks.
    async fn ping(&self) -> Result<(), SyncError>;

    // ─── Seasons ───────────────────────────────────────────────────────────
    async fn upsert_seasons(&self, seasons: &[Season]) -> Result<BulkWriteReport, SyncError>;
    async fn get_season(&self, id: &SeasonId) -> Result<Option<Season>, SyncError>;
    async fn list_seasons(&self) -> Result<Vec<Season>, SyncError>;

    async fn upsert_season(&self, season: &Season) -> Result<(), SyncError> {
        self.upsert_seasons(std::slice::from_ref(season)).await.map(|_| ())
    }

    // ─── Reference entities ────────────────────────────────────────────────
    /// Insert circuits not yet stored; existing circuits are left untouched.
    async fn upsert_circuits(&self, circuits: &[Circuit]) -> Result<BulkWriteReport, SyncError>;
    async fn get_circuit(&self, id: &str) -> Result<Option<Circuit>, SyncError>;

    async fn upsert_constructors(
        &self,
        constructors: &[Constructor],
    ) -> Result<BulkWriteReport, SyncError>;
    async fn get_constructor(&self, id: &str) -> Result<Option<Constructor>, SyncError>;
    async fn list_constructors(&self, active_only: bool) -> Result<Vec<Constructor>, SyncError>;

    /// A timing code already held by another driver moves to the incoming one.
    async fn upsert_drivers(&self, drivers: &[Driver]) -> Result<BulkWriteReport, SyncError>;
    async fn get_driver(&self, id: &str) -> Result<Option<Driver>, SyncError>;
    async fn list_drivers(&self, active_only: bool) -> Result<Vec<Driver>, SyncError>;

    // ─── Races ─────────────────────────────────────────────────────────────
    /// Embedded result blobs are only overwritten when the incoming race carries them.
    async fn upsert_races(&self, races: &[Race]) -> Result<BulkWriteReport, SyncError>;
    async fn get_race(&self, season: &SeasonId, round: u32) -> Result<Option<Race>, SyncError>;
    async fn list_races(&self, season: &SeasonId) -> Result<Vec<Race>, SyncError>;

    async fn upsert_race(&self, race: &Race) -> Result<(), SyncError> {
        self.upsert_races(std::slice::from_ref(race)).await.map(|_| ())
    }

    /// Store the classification and mark the race completed.
    ///
    /// Returns `false` when no such race is stored or `results` is empty.
    async fn record_race_results(
        &self,
        season: &SeasonId,
        round: u32,
        results: &[RaceResult],
    ) -> Result<bool, SyncError>;

    async fn record_qualifying_results(
        &self,
        season: &SeasonId,
        round: u32,
        results: &[QualifyingResult],
    ) -> Result<bool, SyncError>;

    async fn insert_lap_times(
        &self,
        laps: &[LapTime],
        batch_size: usize,
    ) -> Result<BulkWriteReport, SyncError>;
    async fn count_lap_times(&self, race_id: &str) -> Result<u64, SyncError>;

    // ─── Standings ─────────────────────────────────────────────────────────
    async fn upsert_driver_standings(
        &self,
        rows: &[DriverStanding],
    ) -> Result<BulkWriteReport, SyncError>;
    async fn upsert_constructor_standings(
        &self,
        rows: &[ConstructorStanding],
    ) -> Result<BulkWriteReport, SyncError>;

    /// Standings as of `race_id`, or as of the latest stored round when `None`.
    async fn list_driver_standings(
        &self,
        season: &SeasonId,
        race_id: Option<&str>,
    ) -> Result<Vec<DriverStanding>, SyncError>;
    async fn list_constructor_standings(
        &self,
        season: &SeasonId,
        race_id: Option<&str>,
    ) -> Result<Vec<ConstructorStanding>, SyncError>;

    /// Recompute and persist `completed / total` over the season's non-cancelled races.
    async fn recompute_completeness(&self, season: &SeasonId) -> Result<f64, SyncError>;

    // ─── Sync logs ─────────────────────────────────────────────────────────
    async fn start_sync_log(&self, log: &SyncLog) -> Result<(), SyncError>;

    /// Transition a `started` log once. Returns `false` if it was already finished.
    async fn finish_sync_log(&self, id: &str, outcome: &SyncOutcome) -> Result<bool, SyncError>;
    async fn get_sync_log(&self, id: &str) -> Result<Option<SyncLog>, SyncError>;

    /// Most recent first.
    async fn list_sync_logs(
        &self,
        season: Option<&SeasonId>,
        limit: usize,
    ) -> Result<Vec<SyncLog>, SyncError>;
}
