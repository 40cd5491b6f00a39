// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Append-only audit rows for sync runs.
//!
//! A log is written as `started` when a run begins and transitions exactly
//! once to `completed` or `failed`. It is never modified afterwards.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::season::SeasonId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncType {
    Seasons,
    FullSeason,
    RaceResults,
    Standings,
}

impl SyncType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seasons => "seasons",
            Self::FullSeason => "full_season",
            Self::RaceResults => "race_results",
            Self::Standings => "standings",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "seasons" => Some(Self::Seasons),
            "full_season" => Some(Self::FullSeason),
            "race_results" => Some(Self::RaceResults),
            "standings" => Some(Self::Standings),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Started,
    Completed,
    Failed,
}

impl SyncStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "started" => Some(Self::Started),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncLog {
    pub id: String,
    pub sync_type: SyncType,
    pub season_id: Option<SeasonId>,
    pub round: Option<u32>,
    pub status: SyncStatus,
    pub records_processed: u64,
    pub records_failed: u64,
    pub duration_ms: Option<u64>,
    pub error: Option<String>,
    pub started_at: i64,
    pub completed_at: Option<i64>,
}

impl SyncLog {
    #[must_use]
    pub fn start(sync_type: SyncType, season_id: Option<SeasonId>, round: Option<u32>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sync_type,
            season_id,
            round,
            status: SyncStatus::Started,
            records_processed: 0,
            records_failed: 0,
            duration_ms: None,
            error: None,
            started_at: now_millis(),
            completed_at: None,
        }
    }
}

/// Terminal state applied to a started log.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOutcome {
    pub status: SyncStatus,
    pub records_processed: u64,
    pub records_failed: u64,
    pub duration: Duration,
    pub error: Option<String>,
}

impl SyncOutcome {
    #[must_use]
    pub fn completed(records_processed: u64, duration: Duration) -> Self {
        Self {
            status: SyncStatus::Completed,
            records_processed,
            records_failed: 0,
            duration,
            error: None,
        }
    }

    #[must_use]
    pub fn failed(
        records_processed: u64,
        records_failed: u64,
        duration: Duration,
        error: impl Into<String>,
    ) -> Self {
        Self {
            status: SyncStatus::Failed,
            records_processed,
            records_failed,
            duration,
            error: Some(error.into()),
        }
    }
}

/// Wall-clock milliseconds since the Unix epoch.
#[must_use]
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
