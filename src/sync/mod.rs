// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Sync orchestrator.
//!
//! # Full-season sync
//!
//! ```text
//! season row ─► schedule (circuits, races) ─► roster (drivers, constructors)
//!     ─► races  [≤ concurrency in flight: results → qualifying → laps]
//!     ─► standings (driver, constructor) ─► completeness ─► invalidate cache
//! ```
//!
//! Every run writes a [`SyncLog`](crate::model::SyncLog) as `started` and
//! finishes it once. A failing race is logged and the run continues with the
//! remaining races. The season log finishes `failed` if the schedule step,
//! any race, the roster or the standings step failed, or the run deadline
//! expired.

mod race;
mod season;
pub mod types;

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{error, info, instrument};

use crate::cache::{keys, CacheLayer};
use crate::error::SyncError;
use crate::model::{SeasonId, StandingsKind, StandingsSnapshot, SyncLog, SyncOutcome, SyncType};
use crate::normalize;
use crate::source::RacingSource;
use crate::storage::Repository;

use race::RaceWorker;
pub use types::{RaceSyncReport, SeasonSyncReport, SyncOptions, SyncPhase};

pub struct SyncOrchestrator {
    racing: Arc<dyn RacingSource>,
    repo: Arc<dyn Repository>,
    cache: Arc<CacheLayer>,
    options: SyncOptions,
    phase: watch::Sender<SyncPhase>,
}

impl SyncOrchestrator {
    pub fn new(
        racing: Arc<dyn RacingSource>,
        repo: Arc<dyn Repository>,
        cache: Arc<CacheLayer>,
        options: SyncOptions,
    ) -> Self {
        let (phase, _) = watch::channel(SyncPhase::Idle);
        Self { racing, repo, cache, options, phase }
    }

    #[must_use]
    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    #[must_use]
    pub fn phase(&self) -> SyncPhase {
        *self.phase.borrow()
    }

    /// Watch phase transitions.
    pub fn subscribe(&self) -> watch::Receiver<SyncPhase> {
        self.phase.subscribe()
    }

    fn set_phase(&self, phase: SyncPhase) {
        self.phase.send_replace(phase);
        crate::metrics::set_sync_phase(phase.as_str());
    }

    fn worker(&self) -> RaceWorker {
        RaceWorker {
            racing: self.racing.clone(),
            repo: self.repo.clone(),
            sync_lap_times: self.options.sync_lap_times,
            batch_size: self.options.bulk_batch_size,
        }
    }

    async fn open_log(&self, log: &SyncLog) -> Result<(), SyncError> {
        self.repo.start_sync_log(log).await?;
        info!(
            log_id = %log.id,
            sync_type = log.sync_type.as_str(),
            season = ?log.season_id.as_ref().map(SeasonId::as_str),
            round = ?log.round,
            "Sync started"
        );
        Ok(())
    }

    async fn close_log(&self, log: &SyncLog, outcome: &SyncOutcome) -> Result<(), SyncError> {
        if !self.repo.finish_sync_log(&log.id, outcome).await? {
            return Err(SyncError::Persistence(format!("sync log {} was already finished", log.id)));
        }
        crate::metrics::record_sync_run(
            log.sync_type.as_str(),
            outcome.status.as_str(),
            outcome.duration,
        );
        info!(
            log_id = %log.id,
            sync_type = log.sync_type.as_str(),
            status = %outcome.status,
            records = outcome.records_processed,
            failed = outcome.records_failed,
            duration_ms = outcome.duration.as_millis() as u64,
            "Sync finished"
        );
        Ok(())
    }

    /// Finish `log` from the result of a single-step sync and pass the result through.
    async fn finish<T>(
        &self,
        log: &SyncLog,
        started: Instant,
        result: Result<T, SyncError>,
        records: impl Fn(&T) -> u64,
    ) -> Result<T, SyncError> {
        let outcome = match &result {
            Ok(value) => SyncOutcome::completed(records(value), started.elapsed()),
            Err(e) => SyncOutcome::failed(0, 1, started.elapsed(), e.to_string()),
        };
        self.close_log(log, &outcome).await?;
        self.set_phase(SyncPhase::Idle);
        result
    }

    /// Refresh the season list. Returns the number of seasons written.
    #[instrument(skip(self))]
    pub async fn sync_seasons(&self) -> Result<usize, SyncError> {
        let started = Instant::now();
        let log = SyncLog::start(SyncType::Seasons, None, None);
        self.open_log(&log).await?;
        self.set_phase(SyncPhase::Seasons);

        let result = async {
            let raw = self.racing.fetch_seasons().await?;
            let seasons = normalize::seasons(&raw, self.options.current_year())?;
            let report = self.repo.upsert_seasons(&seasons).await?;
            self.cache.invalidate_pattern(&keys::seasons()).await;
            Ok::<_, SyncError>(report.rows)
        }
        .await;

        if let Err(e) = &result {
            error!(error = %e, "Season list sync failed");
        }
        self.finish(&log, started, result, |n| *n as u64).await
    }

    /// Sync one race's results and qualifying.
    ///
    /// The season's schedule is synced first if the race is not stored yet.
    #[instrument(skip(self, season), fields(season = %season))]
    pub async fn sync_race(
        &self,
        season: &SeasonId,
        round: u32,
    ) -> Result<RaceSyncReport, SyncError> {
        let started = Instant::now();
        let log = SyncLog::start(SyncType::RaceResults, Some(season.clone()), Some(round));
        self.open_log(&log).await?;
        self.set_phase(SyncPhase::Races);

        let result = async {
            if self.repo.get_race(season, round).await?.is_none() {
                self.sync_schedule(season).await?;
            }
            let report = self.worker().sync(season, round).await?;
            self.cache.invalidate_all(&keys::race_patterns(season, round)).await;
            Ok::<_, SyncError>(report)
        }
        .await;

        crate::metrics::record_race_sync(result.is_ok());
        if let Err(e) = &result {
            error!(season = %season, round, error = %e, "Race sync failed");
        }
        self.finish(&log, started, result, RaceSyncReport::records).await
    }

    /// Sync driver and constructor standings, season-to-date or as of `round`.
    #[instrument(skip(self, season), fields(season = %season))]
    pub async fn sync_standings(
        &self,
        season: &SeasonId,
        round: Option<u32>,
    ) -> Result<usize, SyncError> {
        let started = Instant::now();
        let log = SyncLog::start(SyncType::Standings, Some(season.clone()), round);
        self.open_log(&log).await?;
        self.set_phase(SyncPhase::Standings);

        let result = async {
            let mut rows = 0;
            for kind in [StandingsKind::Driver, StandingsKind::Constructor] {
                rows += self.sync_standings_kind(season, kind, round).await?;
            }
            self.cache.invalidate_pattern(&format!("standings:{}:*", season)).await;
            Ok::<_, SyncError>(rows)
        }
        .await;

        if let Err(e) = &result {
            error!(season = %season, error = %e, "Standings sync failed");
        }
        self.finish(&log, started, result, |n| *n as u64).await
    }

    async fn sync_standings_kind(
        &self,
        season: &SeasonId,
        kind: StandingsKind,
        round: Option<u32>,
    ) -> Result<usize, SyncError> {
        let raw = self.racing.fetch_standings(season, kind, round).await?;
        let written = match normalize::standings(&raw, season, kind)? {
            None => 0,
            Some(StandingsSnapshot::Driver { rows, .. }) => {
                self.repo.upsert_driver_standings(&rows).await?.rows
            }
            Some(StandingsSnapshot::Constructor { rows, .. }) => {
                self.repo.upsert_constructor_standings(&rows).await?.rows
            }
        };
        Ok(written)
    }

    /// Write the season row, its circuits and its races. Returns the normalized schedule.
    pub(crate) async fn sync_schedule(
        &self,
        season: &SeasonId,
    ) -> Result<normalize::Schedule, SyncError> {
        let is_current = self.options.is_current(season);
        self.repo
            .upsert_season(&crate::model::Season::new(season.clone(), is_current))
            .await?;

        let raw = self.racing.fetch_races(season).await?;
        let schedule = normalize::schedule(&raw)?;
        if schedule.races.is_empty() {
            return Err(SyncError::SourceData(format!("season {} has no races upstream", season)));
        }
        self.repo.upsert_circuits(&schedule.circuits).await?;
        self.repo.upsert_races(&schedule.races).await?;
        Ok(schedule)
    }

    async fn sync_roster(&self, season: &SeasonId) -> Result<usize, SyncError> {
        let is_current = self.options.is_current(season);
        let raw = self.racing.fetch_constructors(season).await?;
        let constructors = normalize::constructors(&raw, is_current)?;
        let raw = self.racing.fetch_drivers(season).await?;
        let drivers = normalize::drivers(&raw, is_current)?;

        let written = self.repo.upsert_constructors(&constructors).await?.rows
            + self.repo.upsert_drivers(&drivers).await?.rows;
        Ok(written)
    }
}
