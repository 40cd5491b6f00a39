// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Telemetry API payloads. Both endpoints return flat JSON arrays.

use serde::Deserialize;
use serde_json::Value;

use super::shape_error;
use super::upstream::{WireCarData, WireTelemetrySession};
use crate::error::SyncError;
use crate::model::{CarDataSample, TelemetrySession};

/// `/sessions?year=`
pub fn telemetry_sessions(raw: &Value) -> Result<Vec<TelemetrySession>, SyncError> {
    let rows =
        Vec::<WireTelemetrySession>::deserialize(raw).map_err(|e| shape_error("sessions", e))?;
    Ok(rows
        .into_iter()
        .map(|w| TelemetrySession {
            session_key: w.session_key,
            meeting_key: w.meeting_key,
            session_name: w.session_name,
            session_type: w.session_type,
            date_start: w.date_start,
            date_end: w.date_end,
            year: w.year,
            circuit_short_name: w.circuit_short_name,
            country_name: w.country_name,
            location: w.location,
        })
        .collect())
}

/// `/car_data?session_key=&driver_number=`
pub fn car_data(raw: &Value) -> Result<Vec<CarDataSample>, SyncError> {
    let rows = Vec::<WireCarData>::deserialize(raw).map_err(|e| shape_error("car_data", e))?;
    Ok(rows
        .into_iter()
        .map(|w| CarDataSample {
            date: w.date,
            session_key: w.session_key,
            driver_number: w.driver_number,
            speed: w.speed,
            rpm: w.rpm,
            n_gear: w.n_gear,
            throttle: w.throttle,
            brake: w.brake,
            drs: w.drs,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sessions() {
        let raw = json!([
            {"session_key": 9472, "meeting_key": 1229, "session_name": "Race", "session_type": "Race",
             "date_start": "2024-03-02T15:00:00+00:00", "year": 2024, "circuit_short_name": "Sakhir",
             "country_name": "Bahrain", "location": "Sakhir"},
            {"session_key": 9473, "session_name": "Practice 1", "year": 2024}
        ]);
        let sessions = telemetry_sessions(&raw).unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].session_key, 9472);
        assert!(sessions[1].meeting_key.is_none());
    }

    #[test]
    fn test_car_data_nulls() {
        let raw = json!([
            {"date": "2024-03-02T15:01:00.123", "session_key": 9472, "driver_number": 1,
             "speed": 312.0, "rpm": 11800.0, "n_gear": 8, "throttle": 100.0, "brake": 0.0, "drs": 12},
            {"date": "2024-03-02T15:01:00.400", "session_key": 9472, "driver_number": 1,
             "speed": null, "rpm": null}
        ]);
        let samples = car_data(&raw).unwrap();
        assert_eq!(samples[0].n_gear, Some(8));
        assert!(samples[1].speed.is_none());
    }

    #[test]
    fn test_object_instead_of_array_fails_closed() {
        let err = telemetry_sessions(&json!({"detail": "not found"})).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::SourceData);
    }
}
