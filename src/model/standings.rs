// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Championship standings snapshots.
//!
//! One row per `(season, race, entity)`. The upstream standings endpoints do
//! not report podiums, fastest laps or DNFs, so those counters are written as
//! zero. They are only authoritative when recomputed from race results.

use serde::{Deserialize, Serialize};

use super::season::SeasonId;
use crate::error::SyncError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StandingsKind {
    Driver,
    Constructor,
}

impl StandingsKind {
    /// Parse the `type=driver|constructor` query value.
    pub fn parse(raw: &str) -> Result<Self, SyncError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "driver" | "drivers" => Ok(Self::Driver),
            "constructor" | "constructors" => Ok(Self::Constructor),
            _ => Err(SyncError::validation(
                "standings type must be 'driver' or 'constructor'",
                raw,
            )),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Driver => "driver",
            Self::Constructor => "constructor",
        }
    }

    /// Upstream endpoint name
    #[must_use]
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::Driver => "driverStandings",
            Self::Constructor => "constructorStandings",
        }
    }
}

impl std::fmt::Display for StandingsKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverStanding {
    pub season_id: SeasonId,
    pub race_id: String,
    pub driver_id: String,
    pub constructor_id: Option<String>,
    pub position: Option<u32>,
    pub position_text: String,
    pub points: f64,
    pub wins: u32,
    pub podiums: u32,
    pub fastest_laps: u32,
    pub dnfs: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstructorStanding {
    pub season_id: SeasonId,
    pub race_id: String,
    pub constructor_id: String,
    pub position: Option<u32>,
    pub position_text: String,
    pub points: f64,
    pub wins: u32,
    pub podiums: u32,
    pub fastest_laps: u32,
    pub dnfs: u32,
}

/// A normalized standings table as of a given round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StandingsSnapshot {
    Driver { round: u32, rows: Vec<DriverStanding> },
    Constructor { round: u32, rows: Vec<ConstructorStanding> },
}

impl StandingsSnapshot {
    #[must_use]
    pub fn round(&self) -> u32 {
        match self {
            Self::Driver { round, .. } | Self::Constructor { round, .. } => *round,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Driver { rows, .. } => rows.len(),
            Self::Constructor { rows, .. } => rows.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parse() {
        assert_eq!(StandingsKind::parse("driver").unwrap(), StandingsKind::Driver);
        assert_eq!(StandingsKind::parse("Constructors").unwrap(), StandingsKind::Constructor);
        assert!(StandingsKind::parse("team").is_err());
    }

    #[test]
    fn test_endpoint_names() {
        assert_eq!(StandingsKind::Driver.endpoint(), "driverStandings");
        assert_eq!(StandingsKind::Constructor.endpoint(), "constructorStandings");
    }
}
