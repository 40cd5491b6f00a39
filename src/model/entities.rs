// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Reference entities: circuits, constructors, drivers.
//!
//! All three are created lazily the first time an upstream record mentions
//! them. Circuits are immutable once stored; constructors and drivers only
//! have their descriptive fields refreshed.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circuit {
    /// Upstream slug, e.g. `monza`
    pub id: String,
    pub name: String,
    pub locality: String,
    pub country: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constructor {
    pub id: String,
    pub name: String,
    pub nationality: Option<String>,
    pub url: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    pub id: String,
    /// Three-letter timing code, unique when present
    pub code: Option<String>,
    pub permanent_number: Option<u32>,
    pub given_name: String,
    pub family_name: String,
    pub full_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub nationality: Option<String>,
    pub url: Option<String>,
    pub is_active: bool,
}

impl Driver {
    #[must_use]
    pub fn compose_full_name(given: &str, family: &str) -> String {
        match (given.trim(), family.trim()) {
            ("", family) => family.to_string(),
            (given, "") => given.to_string(),
            (given, family) => format!("{} {}", given, family),
        }
    }
}
