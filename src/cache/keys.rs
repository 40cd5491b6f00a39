// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Cache key families. Segments are joined with `:` so a season's keys can be
//! invalidated with a glob.

use crate::model::{SeasonId, StandingsKind};

#[must_use]
pub fn seasons() -> String {
    "seasons".to_string()
}

#[must_use]
pub fn races(season: &SeasonId) -> String {
    format!("races:{}", season)
}

#[must_use]
pub fn race(season: &SeasonId, round: u32) -> String {
    format!("races:{}:{}", season, round)
}

#[must_use]
pub fn standings(season: &SeasonId, kind: StandingsKind) -> String {
    format!("standings:{}:{}", season, kind)
}

#[must_use]
pub fn drivers(season: &SeasonId) -> String {
    format!("drivers:{}", season)
}

#[must_use]
pub fn constructors(season: &SeasonId) -> String {
    format!("constructors:{}", season)
}

#[must_use]
pub fn telemetry_sessions(year: i32) -> String {
    format!("telemetry:sessions:{}", year)
}

#[must_use]
pub fn car_data(session_key: u64, driver_number: u32) -> String {
    format!("telemetry:car:{}:{}", session_key, driver_number)
}

/// Every key family derived from a season's stored data.
#[must_use]
pub fn season_patterns(season: &SeasonId) -> Vec<String> {
    vec![
        races(season),
        format!("races:{}:*", season),
        format!("standings:{}:*", season),
        drivers(season),
        constructors(season),
    ]
}

/// Keys touched by a single race's results.
#[must_use]
pub fn race_patterns(season: &SeasonId, round: u32) -> Vec<String> {
    vec![races(season), race(season, round), format!("standings:{}:*", season)]
}
