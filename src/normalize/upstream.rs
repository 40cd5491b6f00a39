// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Wire shapes of the Ergast-compatible racing API.
//!
//! Every response is wrapped as `{"MRData": {limit, offset, total, <Table>}}`
//! and every number arrives as a string. These types only describe the
//! shape; conversion to canonical entities lives in [`super::ergast`].

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(rename = "MRData")]
    pub mr_data: MrData<T>,
}

#[derive(Debug, Deserialize)]
pub struct MrData<T> {
    #[serde(default)]
    pub limit: Option<String>,
    #[serde(default)]
    pub offset: Option<String>,
    #[serde(default)]
    pub total: Option<String>,
    #[serde(flatten)]
    pub body: T,
}

// ─── Tables ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SeasonTableBody {
    #[serde(rename = "SeasonTable")]
    pub table: SeasonTable,
}

#[derive(Debug, Deserialize)]
pub struct SeasonTable {
    #[serde(rename = "Seasons", default)]
    pub seasons: Vec<WireSeason>,
}

#[derive(Debug, Deserialize)]
pub struct RaceTableBody {
    #[serde(rename = "RaceTable")]
    pub table: RaceTable,
}

#[derive(Debug, Deserialize)]
pub struct RaceTable {
    #[serde(default)]
    pub season: Option<String>,
    #[serde(rename = "Races", default)]
    pub races: Vec<WireRace>,
}

#[derive(Debug, Deserialize)]
pub struct DriverTableBody {
    #[serde(rename = "DriverTable")]
    pub table: DriverTable,
}

#[derive(Debug, Deserialize)]
pub struct DriverTable {
    #[serde(rename = "Drivers", default)]
    pub drivers: Vec<WireDriver>,
}

#[derive(Debug, Deserialize)]
pub struct ConstructorTableBody {
    #[serde(rename = "ConstructorTable")]
    pub table: ConstructorTable,
}

#[derive(Debug, Deserialize)]
pub struct ConstructorTable {
    #[serde(rename = "Constructors", default)]
    pub constructors: Vec<WireConstructor>,
}

#[derive(Debug, Deserialize)]
pub struct StandingsTableBody {
    #[serde(rename = "StandingsTable")]
    pub table: StandingsTable,
}

#[derive(Debug, Deserialize)]
pub struct StandingsTable {
    #[serde(default)]
    pub season: Option<String>,
    #[serde(rename = "StandingsLists", default)]
    pub lists: Vec<WireStandingsList>,
}

// ─── Records ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct WireSeason {
    pub season: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WireLocation {
    #[serde(default)]
    pub lat: Option<String>,
    #[serde(default)]
    pub long: Option<String>,
    #[serde(default)]
    pub locality: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WireCircuit {
    #[serde(rename = "circuitId")]
    pub circuit_id: String,
    #[serde(rename = "circuitName")]
    pub circuit_name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(rename = "Location", default)]
    pub location: Option<WireLocation>,
}

#[derive(Debug, Deserialize)]
pub struct WireSession {
    pub date: String,
    #[serde(default)]
    pub time: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WireRace {
    pub season: String,
    pub round: String,
    #[serde(rename = "raceName")]
    pub race_name: String,
    pub date: String,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(rename = "Circuit")]
    pub circuit: WireCircuit,
    #[serde(rename = "Qualifying", default)]
    pub qualifying: Option<WireSession>,
    #[serde(rename = "Sprint", default)]
    pub sprint: Option<WireSession>,
    #[serde(rename = "Results", default)]
    pub results: Option<Vec<WireResult>>,
    #[serde(rename = "QualifyingResults", default)]
    pub qualifying_results: Option<Vec<WireQualifying>>,
    #[serde(rename = "Laps", default)]
    pub laps: Option<Vec<WireLap>>,
}

#[derive(Debug, Deserialize)]
pub struct WireDriver {
    #[serde(rename = "driverId")]
    pub driver_id: String,
    #[serde(rename = "permanentNumber", default)]
    pub permanent_number: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(rename = "givenName", default)]
    pub given_name: String,
    #[serde(rename = "familyName", default)]
    pub family_name: String,
    #[serde(rename = "dateOfBirth", default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub nationality: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WireConstructor {
    #[serde(rename = "constructorId")]
    pub constructor_id: String,
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub nationality: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WireTime {
    #[serde(default)]
    pub millis: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WireSpeed {
    #[serde(default)]
    pub units: Option<String>,
    #[serde(default)]
    pub speed: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WireFastestLap {
    #[serde(default)]
    pub rank: Option<String>,
    #[serde(default)]
    pub lap: Option<String>,
    #[serde(rename = "Time", default)]
    pub time: Option<WireTime>,
    #[serde(rename = "AverageSpeed", default)]
    pub average_speed: Option<WireSpeed>,
}

#[derive(Debug, Deserialize)]
pub struct WireResult {
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(rename = "positionText", default)]
    pub position_text: Option<String>,
    #[serde(default)]
    pub points: Option<String>,
    #[serde(rename = "Driver")]
    pub driver: WireDriver,
    #[serde(rename = "Constructor")]
    pub constructor: WireConstructor,
    #[serde(default)]
    pub grid: Option<String>,
    #[serde(default)]
    pub laps: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(rename = "Time", default)]
    pub time: Option<WireTime>,
    #[serde(rename = "FastestLap", default)]
    pub fastest_lap: Option<WireFastestLap>,
}

#[derive(Debug, Deserialize)]
pub struct WireQualifying {
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(rename = "Driver")]
    pub driver: WireDriver,
    #[serde(rename = "Constructor")]
    pub constructor: WireConstructor,
    #[serde(rename = "Q1", default)]
    pub q1: Option<String>,
    #[serde(rename = "Q2", default)]
    pub q2: Option<String>,
    #[serde(rename = "Q3", default)]
    pub q3: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WireTiming {
    #[serde(rename = "driverId")]
    pub driver_id: String,
    #[serde(default)]
    pub position: Option<String>,
    pub time: String,
}

#[derive(Debug, Deserialize)]
pub struct WireLap {
    pub number: String,
    #[serde(rename = "Timings", default)]
    pub timings: Vec<WireTiming>,
}

#[derive(Debug, Deserialize)]
pub struct WireStandingsList {
    #[serde(default)]
    pub season: Option<String>,
    pub round: String,
    #[serde(rename = "DriverStandings", default)]
    pub driver_standings: Option<Vec<WireDriverStanding>>,
    #[serde(rename = "ConstructorStandings", default)]
    pub constructor_standings: Option<Vec<WireConstructorStanding>>,
}

#[derive(Debug, Deserialize)]
pub struct WireDriverStanding {
    #[serde(default)]
    pub position: Option<String>,
    #[serde(rename = "positionText", default)]
    pub position_text: Option<String>,
    pub points: String,
    #[serde(default)]
    pub wins: Option<String>,
    #[serde(rename = "Driver")]
    pub driver: WireDriver,
    #[serde(rename = "Constructors", default)]
    pub constructors: Vec<WireConstructor>,
}

#[derive(Debug, Deserialize)]
pub struct WireConstructorStanding {
    #[serde(default)]
    pub position: Option<String>,
    #[serde(rename = "positionText", default)]
    pub position_text: Option<String>,
    pub points: String,
    #[serde(default)]
    pub wins: Option<String>,
    #[serde(rename = "Constructor")]
    pub constructor: WireConstructor,
}

// ─── Telemetry (flat arrays) ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct WireTelemetrySession {
    pub session_key: u64,
    #[serde(default)]
    pub meeting_key: Option<u64>,
    pub session_name: String,
    #[serde(default)]
    pub session_type: Option<String>,
    #[serde(default)]
    pub date_start: Option<String>,
    #[serde(default)]
    pub date_end: Option<String>,
    pub year: i32,
    #[serde(default)]
    pub circuit_short_name: Option<String>,
    #[serde(default)]
    pub country_name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WireCarData {
    pub date: String,
    pub session_key: u64,
    pub driver_number: u32,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub rpm: Option<f64>,
    #[serde(default)]
    pub n_gear: Option<i64>,
    #[serde(default)]
    pub throttle: Option<f64>,
    #[serde(default)]
    pub brake: Option<f64>,
    #[serde(default)]
    pub drs: Option<i64>,
}
