// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::season::SeasonId;

/// Race lifecycle. `Scheduled → Completed` happens once results are stored
/// and never reverses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RaceStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl RaceStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "scheduled" => Some(Self::Scheduled),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Status after an upsert carrying `incoming` lands on a row in `self`.
    #[must_use]
    pub fn merge(self, incoming: RaceStatus) -> RaceStatus {
        match self {
            Self::Completed => Self::Completed,
            _ => incoming,
        }
    }
}

impl std::fmt::Display for RaceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FastestLap {
    pub rank: Option<u32>,
    pub lap: Option<u32>,
    pub time: Option<String>,
    pub average_speed_kph: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceResult {
    pub driver_id: String,
    pub constructor_id: String,
    pub number: Option<u32>,
    /// Classified position; absent for some historical entries
    pub position: Option<u32>,
    /// `"1"`, `"R"` (retired), `"D"` (disqualified), ...
    pub position_text: String,
    pub points: f64,
    pub grid: Option<u32>,
    pub laps: Option<u32>,
    pub status: String,
    pub time_millis: Option<u64>,
    pub time_text: Option<String>,
    pub fastest_lap: Option<FastestLap>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualifyingResult {
    pub driver_id: String,
    pub constructor_id: String,
    pub number: Option<u32>,
    pub position: Option<u32>,
    pub q1: Option<String>,
    pub q2: Option<String>,
    pub q3: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LapTime {
    pub race_id: String,
    pub lap: u32,
    pub driver_id: String,
    pub position: Option<u32>,
    pub time_text: String,
    pub millis: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Race {
    /// Surrogate key derived from season and round, see [`Race::make_id`]
    pub id: String,
    pub season_id: SeasonId,
    pub circuit_id: String,
    pub round: u32,
    pub name: String,
    pub date: NaiveDate,
    pub time: Option<String>,
    pub qualifying_date: Option<NaiveDate>,
    pub sprint_date: Option<NaiveDate>,
    pub status: RaceStatus,
    pub url: Option<String>,
    /// Embedded result payloads, stored as JSON blobs on the race row
    pub race_results: Option<Vec<RaceResult>>,
    pub qualifying_results: Option<Vec<QualifyingResult>>,
}

impl Race {
    #[must_use]
    pub fn make_id(season: &SeasonId, round: u32) -> String {
        format!("{}-{:02}", season, round)
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == RaceStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_never_reverses() {
        assert_eq!(RaceStatus::Completed.merge(RaceStatus::Scheduled), RaceStatus::Completed);
        assert_eq!(RaceStatus::Scheduled.merge(RaceStatus::Completed), RaceStatus::Completed);
        assert_eq!(RaceStatus::Scheduled.merge(RaceStatus::Cancelled), RaceStatus::Cancelled);
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for s in [RaceStatus::Scheduled, RaceStatus::Completed, RaceStatus::Cancelled] {
            assert_eq!(RaceStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(RaceStatus::parse("postponed"), None);
    }

    #[test]
    fn test_race_id_is_zero_padded() {
        let season = SeasonId::from_year(2024);
        assert_eq!(Race::make_id(&season, 5), "2024-05");
        assert_eq!(Race::make_id(&season, 24), "2024-24");
    }
}
