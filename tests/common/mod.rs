// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Shared fixtures: upstream payload builders and a scripted racing source.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use pitwall_sync::cache::{CacheLayer, MemoryCacheStore, TtlPolicy};
use pitwall_sync::model::StandingsKind;
use pitwall_sync::{
    RacingSource, SeasonId, SyncError, SyncOptions, SyncOrchestrator, TelemetrySource,
};
use pitwall_sync::storage::MemoryRepository;

pub const DRIVERS: &[(&str, &str, &str, &str)] = &[
    ("max_verstappen", "VER", "Max", "Verstappen"),
    ("perez", "PER", "Sergio", "Pérez"),
    ("hamilton", "HAM", "Lewis", "Hamilton"),
];

pub const CONSTRUCTORS: &[(&str, &str)] = &[("red_bull", "Red Bull"), ("mercedes", "Mercedes")];

fn driver_json(i: usize) -> Value {
    let (id, code, given, family) = DRIVERS[i];
    json!({"driverId": id, "code": code, "givenName": given, "familyName": family, "nationality": "Dutch"})
}

fn constructor_for(i: usize) -> Value {
    let (id, name) = if i < 2 { CONSTRUCTORS[0] } else { CONSTRUCTORS[1] };
    json!({"constructorId": id, "name": name})
}

/// Season calendar with `rounds` races, one per fortnight from March 2023.
pub fn schedule(season: &str, rounds: u32) -> Value {
    let races: Vec<Value> = (1..=rounds)
        .map(|round| {
            let date = chrono::NaiveDate::from_ymd_opt(2023, 3, 1)
                .map(|d| d + chrono::Duration::days(i64::from(round) * 7))
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default();
            json!({
                "season": season,
                "round": round.to_string(),
                "raceName": format!("Grand Prix {}", round),
                "date": date,
                "Circuit": {
                    "circuitId": format!("circuit_{}", round),
                    "circuitName": format!("Circuit {}", round),
                    "Location": {"locality": "Town", "country": "Country", "lat": "1.0", "long": "2.0"}
                }
            })
        })
        .collect();
    json!({"MRData": {"total": rounds.to_string(), "RaceTable": {"season": season, "Races": races}}})
}

pub fn results(season: &str, round: u32) -> Value {
    let rows: Vec<Value> = (0..DRIVERS.len())
        .map(|i| {
            json!({
                "number": (i + 1).to_string(),
                "position": (i + 1).to_string(),
                "positionText": (i + 1).to_string(),
                "points": (["25", "18", "15"][i]),
                "grid": (i + 1).to_string(),
                "laps": "57",
                "status": "Finished",
                "Driver": driver_json(i),
                "Constructor": constructor_for(i)
            })
        })
        .collect();
    race_table(season, round, "Results", rows)
}

pub fn qualifying(season: &str, round: u32) -> Value {
    let rows: Vec<Value> = (0..DRIVERS.len())
        .map(|i| {
            json!({
                "position": (i + 1).to_string(),
                "Driver": driver_json(i),
                "Constructor": constructor_for(i),
                "Q1": "1:30.000"
            })
        })
        .collect();
    race_table(season, round, "QualifyingResults", rows)
}

fn race_table(season: &str, round: u32, field: &str, rows: Vec<Value>) -> Value {
    let mut race = json!({
        "season": season,
        "round": round.to_string(),
        "raceName": format!("Grand Prix {}", round),
        "date": "2023-03-05",
        "Circuit": {"circuitId": format!("circuit_{}", round), "circuitName": format!("Circuit {}", round)}
    });
    race[field] = Value::Array(rows);
    json!({"MRData": {"total": "1", "RaceTable": {"season": season, "round": round.to_string(), "Races": [race]}}})
}

pub fn drivers(season: &str) -> Value {
    let rows: Vec<Value> = (0..DRIVERS.len()).map(driver_json).collect();
    json!({"MRData": {"DriverTable": {"season": season, "Drivers": rows}}})
}

pub fn constructors(season: &str) -> Value {
    let rows: Vec<Value> = CONSTRUCTORS
        .iter()
        .map(|(id, name)| json!({"constructorId": id, "name": name, "nationality": "Austrian"}))
        .collect();
    json!({"MRData": {"ConstructorTable": {"season": season, "Constructors": rows}}})
}

pub fn standings(season: &str, round: u32, kind: StandingsKind) -> Value {
    let list = match kind {
        StandingsKind::Driver => {
            let rows: Vec<Value> = (0..DRIVERS.len())
                .map(|i| {
                    json!({
                        "position": (i + 1).to_string(),
                        "positionText": (i + 1).to_string(),
                        "points": ((3 - i) * 100).to_string(),
                        "wins": "0",
                        "Driver": driver_json(i),
                        "Constructors": [constructor_for(i)]
                    })
                })
                .collect();
            json!({"season": season, "round": round.to_string(), "DriverStandings": rows})
        }
        StandingsKind::Constructor => {
            let rows: Vec<Value> = CONSTRUCTORS
                .iter()
                .enumerate()
                .map(|(i, (id, name))| {
                    json!({
                        "position": (i + 1).to_string(),
                        "positionText": (i + 1).to_string(),
                        "points": ((2 - i) * 300).to_string(),
                        "Constructor": {"constructorId": id, "name": name}
                    })
                })
                .collect();
            json!({"season": season, "round": round.to_string(), "ConstructorStandings": rows})
        }
    };
    json!({"MRData": {"StandingsTable": {"season": season, "StandingsLists": [list]}}})
}

/// Scripted racing source.
///
/// Serves fixture payloads for `rounds` races, optionally sleeping inside
/// each results fetch, and records the peak number of concurrent fetches.
pub struct FakeRacingSource {
    pub rounds: u32,
    pub delay: Duration,
    failing_rounds: Mutex<HashSet<u32>>,
    missing_rounds: Mutex<HashSet<u32>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub result_calls: AtomicUsize,
    pub schedule_calls: AtomicUsize,
}

impl FakeRacingSource {
    pub fn new(rounds: u32) -> Self {
        Self {
            rounds,
            delay: Duration::ZERO,
            failing_rounds: Mutex::new(HashSet::new()),
            missing_rounds: Mutex::new(HashSet::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            result_calls: AtomicUsize::new(0),
            schedule_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn fail_round(&self, round: u32) {
        self.failing_rounds.lock().insert(round);
    }

    /// Results for `round` come back as a permanent upstream data error.
    pub fn drop_round(&self, round: u32) {
        self.missing_rounds.lock().insert(round);
    }

    pub fn heal(&self) {
        self.failing_rounds.lock().clear();
        self.missing_rounds.lock().clear();
    }

    pub fn peak_concurrency(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl RacingSource for FakeRacingSource {
    async fn fetch_seasons(&self) -> Result<Value, SyncError> {
        Ok(json!({"MRData": {"SeasonTable": {"Seasons": [{"season": "2023"}, {"season": "2024"}]}}}))
    }

    async fn fetch_races(&self, season: &SeasonId) -> Result<Value, SyncError> {
        self.schedule_calls.fetch_add(1, Ordering::SeqCst);
        Ok(schedule(season.as_str(), self.rounds))
    }

    async fn fetch_race_results(&self, season: &SeasonId, round: u32) -> Result<Value, SyncError> {
        self.result_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing_rounds.lock().contains(&round) {
            return Err(SyncError::SourceUnavailable(format!("round {} upstream 503", round)));
        }
        if self.missing_rounds.lock().contains(&round) {
            return Err(SyncError::SourceData(format!("round {} has no results upstream", round)));
        }
        Ok(results(season.as_str(), round))
    }

    async fn fetch_qualifying(&self, season: &SeasonId, round: u32) -> Result<Value, SyncError> {
        Ok(qualifying(season.as_str(), round))
    }

    async fn fetch_lap_times(
        &self,
        _season: &SeasonId,
        _round: u32,
    ) -> Result<Vec<Value>, SyncError> {
        Ok(Vec::new())
    }

    async fn fetch_drivers(&self, season: &SeasonId) -> Result<Value, SyncError> {
        Ok(drivers(season.as_str()))
    }

    async fn fetch_constructors(&self, season: &SeasonId) -> Result<Value, SyncError> {
        Ok(constructors(season.as_str()))
    }

    async fn fetch_standings(
        &self,
        season: &SeasonId,
        kind: StandingsKind,
        round: Option<u32>,
    ) -> Result<Value, SyncError> {
        Ok(standings(season.as_str(), round.unwrap_or(self.rounds), kind))
    }
}

pub struct NoTelemetry;

#[async_trait]
impl TelemetrySource for NoTelemetry {
    async fn fetch_sessions(&self, _year: i32) -> Result<Value, SyncError> {
        Ok(json!([]))
    }

    async fn fetch_car_data(
        &self,
        _session_key: u64,
        _driver_number: u32,
    ) -> Result<Value, SyncError> {
        Ok(json!([]))
    }
}

pub struct Harness {
    pub source: Arc<FakeRacingSource>,
    pub repo: Arc<MemoryRepository>,
    pub cache: Arc<CacheLayer>,
    pub orchestrator: SyncOrchestrator,
}

/// Orchestrator over in-memory collaborators. 2024 is the current season.
pub fn harness(source: FakeRacingSource, options: SyncOptions) -> Harness {
    let source = Arc::new(source);
    let repo = Arc::new(MemoryRepository::new());
    let policy = TtlPolicy { current_season: Some(2024), ..TtlPolicy::default() };
    let cache = Arc::new(CacheLayer::new(Arc::new(MemoryCacheStore::default()), policy));
    let options = SyncOptions { current_season: Some(2024), ..options };
    let orchestrator = SyncOrchestrator::new(source.clone(), repo.clone(), cache.clone(), options);
    Harness { source, repo, cache, orchestrator }
}
