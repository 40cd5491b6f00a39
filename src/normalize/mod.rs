// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Upstream JSON → canonical entities.
//!
//! Each function validates the payload against a typed wire shape first and
//! maps second. A shape mismatch fails closed with [`SyncError::SourceData`];
//! a missing optional field maps to `None`. Nothing here performs I/O.
//!
//! ```
//! use pitwall_sync::normalize::parse_lap_time_millis;
//!
//! assert_eq!(parse_lap_time_millis("1:32.123"), Some(92_123));
//! assert_eq!(parse_lap_time_millis("59.001"), Some(59_001));
//! assert_eq!(parse_lap_time_millis("+1 Lap"), None);
//! ```

pub mod ergast;
pub mod openf1;
pub mod upstream;

use chrono::NaiveDate;

use crate::error::SyncError;

pub use ergast::{
    constructors, drivers, lap_times, page_info, qualifying, race_results, schedule, seasons,
    standings, PageInfo, QualifyingSet, ResultSet, Schedule,
};
pub use openf1::{car_data, telemetry_sessions};

pub(crate) fn shape_error(endpoint: &str, err: impl std::fmt::Display) -> SyncError {
    SyncError::SourceData(format!("unexpected {} payload: {}", endpoint, err))
}

pub(crate) fn required_u32(endpoint: &str, field: &str, raw: &str) -> Result<u32, SyncError> {
    raw.trim()
        .parse()
        .map_err(|_| shape_error(endpoint, format!("{} is not a number: '{}'", field, raw)))
}

pub(crate) fn optional_u32(raw: Option<&String>) -> Option<u32> {
    raw.and_then(|s| s.trim().parse().ok())
}

pub(crate) fn optional_u64(raw: Option<&String>) -> Option<u64> {
    raw.and_then(|s| s.trim().parse().ok())
}

pub(crate) fn optional_f64(raw: Option<&String>) -> Option<f64> {
    raw.and_then(|s| s.trim().parse::<f64>().ok()).filter(|v| v.is_finite())
}

pub(crate) fn required_date(
    endpoint: &str,
    field: &str,
    raw: &str,
) -> Result<NaiveDate, SyncError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| shape_error(endpoint, format!("{} is not a date: '{}'", field, raw)))
}

pub(crate) fn optional_date(raw: Option<&String>) -> Option<NaiveDate> {
    raw.and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
}

pub(crate) fn non_empty(raw: Option<&String>) -> Option<String> {
    raw.map(|s| s.trim()).filter(|s| !s.is_empty()).map(str::to_string)
}

/// Parse a timing string (`"1:32.123"`, `"59.001"`, `"1:31:44.742"`) to milliseconds.
#[must_use]
pub fn parse_lap_time_millis(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let mut parts: Vec<&str> = raw.split(':').collect();
    if parts.len() > 3 {
        return None;
    }
    let seconds_part = parts.pop()?;
    let (whole, frac) = match seconds_part.split_once('.') {
        Some((w, f)) => (w, f),
        None => (seconds_part, ""),
    };
    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if !frac.bytes().all(|b| b.is_ascii_digit()) || frac.len() > 3 {
        return None;
    }
    let seconds: u64 = whole.parse().ok()?;
    let millis_frac: u64 = if frac.is_empty() {
        0
    } else {
        format!("{:0<3}", frac).parse().ok()?
    };

    let mut total = seconds.checked_mul(1000)?.checked_add(millis_frac)?;
    let mut unit = 60_000u64;
    for part in parts.iter().rev() {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let v: u64 = part.parse().ok()?;
        total = total.checked_add(v.checked_mul(unit)?)?;
        unit = unit.checked_mul(60)?;
    }
    Some(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lap_time_formats() {
        assert_eq!(parse_lap_time_millis("1:32.123"), Some(92_123));
        assert_eq!(parse_lap_time_millis("1:31:44.742"), Some(5_504_742));
        assert_eq!(parse_lap_time_millis("45.5"), Some(45_500));
        assert_eq!(parse_lap_time_millis("2:00"), Some(120_000));
    }

    #[test]
    fn test_lap_time_rejects_garbage() {
        assert_eq!(parse_lap_time_millis(""), None);
        assert_eq!(parse_lap_time_millis("+5.123"), None);
        assert_eq!(parse_lap_time_millis("1:2:3:4.5"), None);
        assert_eq!(parse_lap_time_millis("1:.5"), None);
        assert_eq!(parse_lap_time_millis("DNF"), None);
    }

    #[test]
    fn test_optional_numbers() {
        assert_eq!(optional_u32(Some(&"7".to_string())), Some(7));
        assert_eq!(optional_u32(Some(&"".to_string())), None);
        assert_eq!(optional_u32(None), None);
        assert_eq!(optional_f64(Some(&"12.5".to_string())), Some(12.5));
        assert_eq!(optional_f64(Some(&"NaN".to_string())), None);
    }
}
