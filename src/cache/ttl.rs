// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! TTL classes by data volatility.
//!
//! | class | data | default TTL |
//! |---|---|---|
//! | `Static` | driver/constructor rosters, season list | 24h |
//! | `Historical` | past-season races and standings | 7d |
//! | `CurrentSeason` | this season's races and standings | 30 min |
//! | `Realtime` | telemetry sessions and car data | 5 min |

use chrono::Datelike;
use std::time::Duration;

use crate::model::SeasonId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TtlClass {
    Static,
    Historical,
    CurrentSeason,
    Realtime,
}

impl TtlClass {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Historical => "historical",
            Self::CurrentSeason => "current_season",
            Self::Realtime => "realtime",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TtlPolicy {
    pub static_ttl: Duration,
    pub historical_ttl: Duration,
    pub current_season_ttl: Duration,
    pub realtime_ttl: Duration,
    /// How long an expired entry stays available for stale-serve.
    pub stale_retention: Duration,
    /// Overrides the clock-derived current season.
    pub current_season: Option<i32>,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            static_ttl: Duration::from_secs(24 * 3600),
            historical_ttl: Duration::from_secs(7 * 24 * 3600),
            current_season_ttl: Duration::from_secs(30 * 60),
            realtime_ttl: Duration::from_secs(5 * 60),
            stale_retention: Duration::from_secs(7 * 24 * 3600),
            current_season: None,
        }
    }
}

impl TtlPolicy {
    #[must_use]
    pub fn ttl(&self, class: TtlClass) -> Duration {
        match class {
            TtlClass::Static => self.static_ttl,
            TtlClass::Historical => self.historical_ttl,
            TtlClass::CurrentSeason => self.current_season_ttl,
            TtlClass::Realtime => self.realtime_ttl,
        }
    }

    #[must_use]
    pub fn current_year(&self) -> i32 {
        self.current_season.unwrap_or_else(|| chrono::Utc::now().year())
    }

    #[must_use]
    pub fn is_current(&self, season: &SeasonId) -> bool {
        season.year() >= self.current_year()
    }

    #[must_use]
    pub fn class_for_season(&self, season: &SeasonId) -> TtlClass {
        if self.is_current(season) {
            TtlClass::CurrentSeason
        } else {
            TtlClass::Historical
        }
    }

    #[must_use]
    pub fn for_season(&self, season: &SeasonId) -> Duration {
        self.ttl(self.class_for_season(season))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_season_classification() {
        let policy = TtlPolicy {
            current_season: Some(2024),
            ..TtlPolicy::default()
        };
        assert_eq!(policy.class_for_season(&SeasonId::from_year(2024)), TtlClass::CurrentSeason);
        assert_eq!(policy.class_for_season(&SeasonId::from_year(2025)), TtlClass::CurrentSeason);
        assert_eq!(policy.class_for_season(&SeasonId::from_year(2021)), TtlClass::Historical);
        assert_eq!(policy.for_season(&SeasonId::from_year(2021)), Duration::from_secs(604_800));
        assert_eq!(policy.for_season(&SeasonId::from_year(2024)), Duration::from_secs(1800));
    }

    #[test]
    fn test_defaults_match_volatility_table() {
        let policy = TtlPolicy::default();
        assert_eq!(policy.ttl(TtlClass::Static), Duration::from_secs(86_400));
        assert_eq!(policy.ttl(TtlClass::Realtime), Duration::from_secs(300));
        assert!(policy.ttl(TtlClass::CurrentSeason) < policy.ttl(TtlClass::Historical));
    }
}
