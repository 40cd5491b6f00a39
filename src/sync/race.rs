// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Per-race sync: results, then qualifying, then (optionally) lap times.
//!
//! Results are written before completeness is recomputed, so a season's
//! completeness never counts a race whose results are not stored.

use std::sync::Arc;
use tracing::debug;

use super::types::RaceSyncReport;
use crate::error::SyncError;
use crate::model::SeasonId;
use crate::normalize;
use crate::source::RacingSource;
use crate::storage::Repository;

/// Cloneable handle moved into each spawned race task.
#[derive(Clone)]
pub(super) struct RaceWorker {
    pub racing: Arc<dyn RacingSource>,
    pub repo: Arc<dyn Repository>,
    pub sync_lap_times: bool,
    pub batch_size: usize,
}

impl RaceWorker {
    pub async fn sync(&self, season: &SeasonId, round: u32) -> Result<RaceSyncReport, SyncError> {
        let raw = self.racing.fetch_race_results(season, round).await?;
        let results = normalize::race_results(&raw)?;

        // Referenced entities first; a race can field a one-off entrant missing from the roster
        self.repo.upsert_constructors(&results.constructors).await?;
        self.repo.upsert_drivers(&results.drivers).await?;
        let completed = self.repo.record_race_results(season, round, &results.results).await?;

        let raw = self.racing.fetch_qualifying(season, round).await?;
        let qualifying = normalize::qualifying(&raw)?;
        self.repo.upsert_constructors(&qualifying.constructors).await?;
        self.repo.upsert_drivers(&qualifying.drivers).await?;
        self.repo
            .record_qualifying_results(season, round, &qualifying.results)
            .await?;

        let laps = if self.sync_lap_times && completed {
            self.sync_laps(season, round).await?
        } else {
            0
        };

        if completed {
            let completeness = self.repo.recompute_completeness(season).await?;
            debug!(season = %season, round, completeness, "Race results recorded");
        }

        Ok(RaceSyncReport {
            season: season.clone(),
            round,
            results: results.results.len(),
            qualifying: qualifying.results.len(),
            laps,
            completed,
        })
    }

    async fn sync_laps(&self, season: &SeasonId, round: u32) -> Result<usize, SyncError> {
        let pages = self.racing.fetch_lap_times(season, round).await?;
        let mut laps = Vec::new();
        for page in &pages {
            laps.extend(normalize::lap_times(page)?);
        }
        let report = self.repo.insert_lap_times(&laps, self.batch_size).await?;
        Ok(report.rows)
    }
}
