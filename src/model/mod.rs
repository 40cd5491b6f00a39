// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Canonical entity shapes shared by the normalizer, repository and cache.

pub mod entities;
pub mod race;
pub mod season;
pub mod standings;
pub mod sync_log;
pub mod telemetry;

pub use entities::{Circuit, Constructor, Driver};
pub use race::{FastestLap, LapTime, QualifyingResult, Race, RaceResult, RaceStatus};
pub use season::{calculate_completeness, Season, SeasonId};
pub use standings::{ConstructorStanding, DriverStanding, StandingsKind, StandingsSnapshot};
pub use sync_log::{now_millis, SyncLog, SyncOutcome, SyncStatus, SyncType};
pub use telemetry::{CarDataSample, TelemetrySession};
