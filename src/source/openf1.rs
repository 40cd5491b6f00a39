// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use super::http::HttpFetcher;
use super::TelemetrySource;
use crate::error::SyncError;

/// Client for the OpenF1-compatible telemetry API.
#[derive(Clone)]
pub struct OpenF1Client {
    http: HttpFetcher,
}

impl OpenF1Client {
    pub const API: &'static str = "telemetry_api";

    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SyncError> {
        Ok(Self {
            http: HttpFetcher::new(Self::API, base_url, timeout)?,
        })
    }
}

#[async_trait]
impl TelemetrySource for OpenF1Client {
    async fn fetch_sessions(&self, year: i32) -> Result<Value, SyncError> {
        self.http
            .get_json("sessions", "/sessions", &[("year", year.to_string())])
            .await
    }

    async fn fetch_car_data(
        &self,
        session_key: u64,
        driver_number: u32,
    ) -> Result<Value, SyncError> {
        self.http
            .get_json(
                "car_data",
                "/car_data",
                &[
                    ("session_key", session_key.to_string()),
                    ("driver_number", driver_number.to_string()),
                ],
            )
            .await
    }
}
