// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{error, info, instrument, warn};

use super::types::{RaceSyncReport, SeasonProgress, SeasonSyncReport, SyncPhase};
use super::SyncOrchestrator;
use crate::cache::keys;
use crate::error::SyncError;
use crate::model::{RaceStatus, SeasonId, StandingsKind, SyncLog, SyncOutcome, SyncStatus, SyncType};

impl SyncOrchestrator {
    /// Full-season sync. See the [module docs](super) for the step order.
    ///
    /// Returns a report for every run whose log could be written, including
    /// failed runs; `Err` means the sync log itself could not be written.
    #[instrument(skip(self, season), fields(season = %season))]
    pub async fn sync_season(&self, season: &SeasonId) -> Result<SeasonSyncReport, SyncError> {
        let started = Instant::now();
        let log = SyncLog::start(SyncType::FullSeason, Some(season.clone()), None);
        self.open_log(&log).await?;

        let mut progress = SeasonProgress::default();
        let deadline = self.options.run_timeout;
        let run = self.run_season(season, &mut progress);
        let aborted = match tokio::time::timeout(deadline, run).await {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e),
            Err(_) => Some(SyncError::Timeout {
                operation: format!("season {} sync", season),
                after: deadline,
            }),
        };

        self.set_phase(SyncPhase::Finalizing);
        if let Some(e) = &aborted {
            error!(season = %season, error = %e, "Season sync aborted");
            progress.step_failed("aborted", e);
        }

        let duration = started.elapsed();
        let error = progress.error_summary();
        let outcome = match &error {
            None => SyncOutcome::completed(progress.records_processed, duration),
            Some(summary) => SyncOutcome::failed(
                progress.records_processed,
                progress.records_failed,
                duration,
                summary.clone(),
            ),
        };
        self.close_log(&log, &outcome).await?;
        self.set_phase(SyncPhase::Idle);

        let mut failed_rounds = progress.failed_rounds;
        failed_rounds.sort_unstable();
        Ok(SeasonSyncReport {
            season: season.clone(),
            log_id: log.id,
            status: outcome.status,
            races_total: progress.races_total,
            races_synced: progress.races_synced,
            races_skipped: progress.races_skipped,
            failed_rounds,
            records_processed: progress.records_processed,
            records_failed: progress.records_failed,
            completeness: progress.completeness,
            duration,
            error,
            error_kind: if outcome.status == SyncStatus::Failed {
                progress.first_error_kind
            } else {
                None
            },
        })
    }

    /// Returns `Err` only for failures that make the remaining steps meaningless.
    async fn run_season(
        &self,
        season: &SeasonId,
        progress: &mut SeasonProgress,
    ) -> Result<(), SyncError> {
        self.set_phase(SyncPhase::Schedule);
        let schedule = self.sync_schedule(season).await?;
        progress.races_total = schedule.races.len();
        progress.records_processed += (schedule.races.len() + schedule.circuits.len()) as u64;
        info!(season = %season, races = schedule.races.len(), "Schedule synced");

        self.set_phase(SyncPhase::Roster);
        match self.sync_roster(season).await {
            Ok(n) => progress.records_processed += n as u64,
            Err(e) => {
                error!(season = %season, error = %e, "Roster sync failed");
                progress.step_failed("roster", &e);
            }
        }

        self.set_phase(SyncPhase::Races);
        let today = chrono::Utc::now().date_naive();
        let rounds: Vec<u32> = schedule
            .races
            .iter()
            .filter(|r| r.status != RaceStatus::Cancelled && r.date <= today)
            .map(|r| r.round)
            .collect();
        progress.races_skipped = schedule.races.len() - rounds.len();
        self.sync_races(season, &rounds, progress).await;

        self.set_phase(SyncPhase::Standings);
        for kind in [StandingsKind::Driver, StandingsKind::Constructor] {
            match self.sync_standings_kind(season, kind, None).await {
                Ok(n) => progress.records_processed += n as u64,
                Err(e) => {
                    error!(season = %season, kind = %kind, error = %e, "Standings sync failed");
                    progress.step_failed(&format!("{} standings", kind), &e);
                }
            }
        }

        self.set_phase(SyncPhase::Completeness);
        progress.completeness = self.repo.recompute_completeness(season).await?;

        let removed = self.cache.invalidate_all(&keys::season_patterns(season)).await;
        info!(season = %season, completeness = progress.completeness, invalidated = removed, "Season data refreshed");
        Ok(())
    }

    /// Run race syncs with at most `concurrency` in flight. Failures are recorded, never raised.
    async fn sync_races(&self, season: &SeasonId, rounds: &[u32], progress: &mut SeasonProgress) {
        let limiter = Arc::new(Semaphore::new(self.options.concurrency.max(1)));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let mut pending: BTreeSet<u32> = BTreeSet::new();
        let mut tasks = JoinSet::new();

        for &round in rounds {
            // A new race starts only once a slot frees up
            let Ok(permit) = limiter.clone().acquire_owned().await else {
                break;
            };
            // Record races that already finished so a deadline keeps their counts
            while let Some(joined) = tasks.try_join_next() {
                record_race(season, joined, &mut pending, progress);
            }
            let worker = self.worker();
            let season = season.clone();
            let in_flight = in_flight.clone();
            pending.insert(round);
            tasks.spawn(async move {
                let _permit = permit;
                crate::metrics::set_races_in_flight(in_flight.fetch_add(1, Ordering::SeqCst) + 1);
                let result = worker.sync(&season, round).await;
                crate::metrics::set_races_in_flight(in_flight.fetch_sub(1, Ordering::SeqCst) - 1);
                (round, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            record_race(season, joined, &mut pending, progress);
        }

        // Tasks that panicked never reported their round
        for round in pending {
            crate::metrics::record_race_sync(false);
            progress.race_failed(round, None);
        }
    }
}

type JoinedRace = Result<(u32, Result<RaceSyncReport, SyncError>), JoinError>;

fn record_race(
    season: &SeasonId,
    joined: JoinedRace,
    pending: &mut BTreeSet<u32>,
    progress: &mut SeasonProgress,
) {
    match joined {
        Ok((round, Ok(report))) => {
            pending.remove(&round);
            crate::metrics::record_race_sync(true);
            progress.races_synced += 1;
            progress.records_processed += report.records();
        }
        Ok((round, Err(e))) => {
            pending.remove(&round);
            crate::metrics::record_race_sync(false);
            error!(season = %season, round, error = %e, "Race sync failed, continuing with remaining races");
            progress.race_failed(round, Some(e.kind()));
        }
        Err(e) => warn!(season = %season, error = %e, "Race sync task did not complete"),
    }
}
