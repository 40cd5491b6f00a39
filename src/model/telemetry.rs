// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Telemetry records. Served through the realtime cache class only, never persisted.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySession {
    pub session_key: u64,
    pub meeting_key: Option<u64>,
    pub session_name: String,
    pub session_type: Option<String>,
    pub date_start: Option<String>,
    pub date_end: Option<String>,
    pub year: i32,
    pub circuit_short_name: Option<String>,
    pub country_name: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarDataSample {
    pub date: String,
    pub session_key: u64,
    pub driver_number: u32,
    pub speed: Option<f64>,
    pub rpm: Option<f64>,
    pub n_gear: Option<i64>,
    pub throttle: Option<f64>,
    pub brake: Option<f64>,
    pub drs: Option<i64>,
}
