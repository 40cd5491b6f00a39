// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Public types for the sync orchestrator.

use chrono::Datelike;
use std::time::Duration;

use crate::error::ErrorKind;
use crate::model::{SeasonId, SyncStatus};

/// Tuning for sync runs.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOptions {
    /// Maximum race syncs in flight at once
    pub concurrency: usize,
    /// Rows per transaction for lap time bulk inserts
    pub bulk_batch_size: usize,
    /// Deadline for one full-season sync
    pub run_timeout: Duration,
    pub sync_lap_times: bool,
    /// Overrides the clock-derived current season
    pub current_season: Option<i32>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            concurrency: 5,
            bulk_batch_size: 5000,
            run_timeout: Duration::from_secs(1800),
            sync_lap_times: false,
            current_season: None,
        }
    }
}

impl SyncOptions {
    #[must_use]
    pub fn current_year(&self) -> i32 {
        self.current_season.unwrap_or_else(|| chrono::Utc::now().year())
    }

    #[must_use]
    pub fn is_current(&self, season: &SeasonId) -> bool {
        season.year() >= self.current_year()
    }
}

/// Step the orchestrator is currently executing.
///
/// Published on a watch channel; see [`super::SyncOrchestrator::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    Seasons,
    Schedule,
    Roster,
    Races,
    Standings,
    Completeness,
    Finalizing,
}

impl SyncPhase {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Seasons => "seasons",
            Self::Schedule => "schedule",
            Self::Roster => "roster",
            Self::Races => "races",
            Self::Standings => "standings",
            Self::Completeness => "completeness",
            Self::Finalizing => "finalizing",
        }
    }
}

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one race's results/qualifying/laps sync.
#[derive(Debug, Clone, PartialEq)]
pub struct RaceSyncReport {
    pub season: SeasonId,
    pub round: u32,
    pub results: usize,
    pub qualifying: usize,
    pub laps: usize,
    /// Results were written and the race is now `completed`
    pub completed: bool,
}

impl RaceSyncReport {
    #[must_use]
    pub fn records(&self) -> u64 {
        (self.results + self.qualifying + self.laps) as u64
    }
}

/// Outcome of a full-season sync.
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonSyncReport {
    pub season: SeasonId,
    pub log_id: String,
    pub status: SyncStatus,
    pub races_total: usize,
    pub races_synced: usize,
    /// Cancelled or not yet run
    pub races_skipped: usize,
    pub failed_rounds: Vec<u32>,
    pub records_processed: u64,
    pub records_failed: u64,
    pub completeness: f64,
    pub duration: Duration,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
}

impl SeasonSyncReport {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == SyncStatus::Completed
    }
}

/// Accumulated while a season sync runs, so a deadline keeps partial counts.
#[derive(Debug, Default)]
pub(super) struct SeasonProgress {
    pub races_total: usize,
    pub races_synced: usize,
    pub races_skipped: usize,
    pub failed_rounds: Vec<u32>,
    pub records_processed: u64,
    pub records_failed: u64,
    pub completeness: f64,
    /// Failed steps other than individual races, as `step: error`
    pub step_errors: Vec<String>,
    pub first_error_kind: Option<ErrorKind>,
}

impl SeasonProgress {
    pub fn step_failed(&mut self, step: &str, err: &crate::error::SyncError) {
        self.records_failed += 1;
        self.step_errors.push(format!("{}: {}", step, err));
        self.first_error_kind.get_or_insert(err.kind());
    }

    pub fn race_failed(&mut self, round: u32, kind: Option<ErrorKind>) {
        self.records_failed += 1;
        self.failed_rounds.push(round);
        if let Some(kind) = kind {
            self.first_error_kind.get_or_insert(kind);
        }
    }

    /// One-line failure summary for the sync log.
    pub fn error_summary(&self) -> Option<String> {
        let mut parts = self.step_errors.clone();
        if !self.failed_rounds.is_empty() {
            let mut rounds = self.failed_rounds.clone();
            rounds.sort_unstable();
            let list: Vec<String> = rounds.iter().map(u32::to_string).collect();
            parts.push(format!(
                "{} of {} races failed (rounds {})",
                rounds.len(),
                self.races_total,
                list.join(", ")
            ));
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("; "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;

    #[test]
    fn test_phase_display() {
        assert_eq!(SyncPhase::Idle.to_string(), "idle");
        assert_eq!(SyncPhase::Standings.to_string(), "standings");
    }

    #[test]
    fn test_current_season_override() {
        let options = SyncOptions { current_season: Some(2024), ..SyncOptions::default() };
        assert!(options.is_current(&SeasonId::from_year(2024)));
        assert!(!options.is_current(&SeasonId::from_year(2023)));
    }

    #[test]
    fn test_error_summary_lists_sorted_rounds() {
        let mut progress = SeasonProgress { races_total: 24, ..SeasonProgress::default() };
        assert!(progress.error_summary().is_none());
        progress.race_failed(12, None);
        progress.race_failed(7, Some(ErrorKind::SourceData));
        progress.step_failed("standings", &SyncError::SourceUnavailable("503".into()));
        let summary = progress.error_summary().unwrap();
        assert!(summary.starts_with("standings: source unavailable: 503"));
        assert!(summary.ends_with("2 of 24 races failed (rounds 7, 12)"));
        assert_eq!(progress.first_error_kind, Some(ErrorKind::SourceData));
        assert_eq!(progress.records_failed, 3);
    }
}
