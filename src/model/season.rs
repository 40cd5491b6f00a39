// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// A season identifier: a 4-digit year string.
///
/// ```
/// use pitwall_sync::SeasonId;
///
/// let season = SeasonId::parse("2024").unwrap();
/// assert_eq!(season.year(), 2024);
/// assert!(SeasonId::parse("24").is_err());
/// assert!(SeasonId::parse("current").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SeasonId(String);

impl SeasonId {
    pub fn parse(raw: &str) -> Result<Self, SyncError> {
        let trimmed = raw.trim();
        if trimmed.len() == 4 && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(SyncError::validation("season must be a 4-digit year", raw))
        }
    }

    #[must_use]
    pub fn from_year(year: u16) -> Self {
        Self(format!("{:04}", year))
    }

    #[must_use]
    pub fn year(&self) -> i32 {
        self.0.parse().unwrap_or_default()
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SeasonId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SeasonId {
    type Error = SyncError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SeasonId> for String {
    fn from(id: SeasonId) -> Self {
        id.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Season {
    pub id: SeasonId,
    pub year: i32,
    pub name: String,
    /// Fraction of the season's races with recorded results (0.0 - 1.0).
    pub completeness: f64,
    pub is_active: bool,
}

impl Season {
    #[must_use]
    pub fn new(id: SeasonId, is_active: bool) -> Self {
        let year = id.year();
        Self {
            name: format!("{} Formula One World Championship", year),
            id,
            year,
            completeness: 0.0,
            is_active,
        }
    }
}

/// `completed / total`, or 0.0 for a season with no races.
#[must_use]
pub fn calculate_completeness(completed_races: u64, total_races: u64) -> f64 {
    if total_races == 0 {
        return 0.0;
    }
    completed_races.min(total_races) as f64 / total_races as f64
}
