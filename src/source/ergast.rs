// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::http::HttpFetcher;
use super::RacingSource;
use crate::error::SyncError;
use crate::model::{SeasonId, StandingsKind};
use crate::normalize::page_info;

/// Largest page the racing API serves
pub const PAGE_LIMIT: u64 = 100;

/// Hard stop for pagination loops against a misbehaving `total`
const MAX_PAGES: usize = 500;

/// Client for the Ergast-compatible racing statistics API.
#[derive(Clone)]
pub struct ErgastClient {
    http: HttpFetcher,
}

impl ErgastClient {
    pub const API: &'static str = "racing_api";

    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SyncError> {
        Ok(Self {
            http: HttpFetcher::new(Self::API, base_url, timeout)?,
        })
    }

    async fn get(&self, endpoint: &str, path: &str, offset: u64) -> Result<Value, SyncError> {
        let mut query = vec![("limit", PAGE_LIMIT.to_string())];
        if offset > 0 {
            query.push(("offset", offset.to_string()));
        }
        self.http.get_json(endpoint, path, &query).await
    }
}

#[async_trait]
impl RacingSource for ErgastClient {
    async fn fetch_seasons(&self) -> Result<Value, SyncError> {
        self.get("seasons", "/seasons.json", 0).await
    }

    async fn fetch_races(&self, season: &SeasonId) -> Result<Value, SyncError> {
        self.get("races", &format!("/{}.json", season), 0).await
    }

    async fn fetch_race_results(&self, season: &SeasonId, round: u32) -> Result<Value, SyncError> {
        self.get("results", &format!("/{}/{}/results.json", season, round), 0).await
    }

    async fn fetch_qualifying(&self, season: &SeasonId, round: u32) -> Result<Value, SyncError> {
        self.get("qualifying", &format!("/{}/{}/qualifying.json", season, round), 0).await
    }

    async fn fetch_lap_times(
        &self,
        season: &SeasonId,
        round: u32,
    ) -> Result<Vec<Value>, SyncError> {
        let path = format!("/{}/{}/laps.json", season, round);
        let mut pages = Vec::new();
        let mut offset = 0;
        loop {
            let page = self.get("laps", &path, offset).await?;
            let info = page_info(&page)?;
            pages.push(page);
            match info.next_offset() {
                Some(next) if pages.len() < MAX_PAGES => offset = next,
                _ => break,
            }
        }
        debug!(season = %season, round, pages = pages.len(), "Fetched lap time pages");
        Ok(pages)
    }

    async fn fetch_drivers(&self, season: &SeasonId) -> Result<Value, SyncError> {
        self.get("drivers", &format!("/{}/drivers.json", season), 0).await
    }

    async fn fetch_constructors(&self, season: &SeasonId) -> Result<Value, SyncError> {
        self.get("constructors", &format!("/{}/constructors.json", season), 0).await
    }

    async fn fetch_standings(
        &self,
        season: &SeasonId,
        kind: StandingsKind,
        round: Option<u32>,
    ) -> Result<Value, SyncError> {
        let path = match round {
            Some(r) => format!("/{}/{}/{}.json", season, r, kind.endpoint()),
            None => format!("/{}/{}.json", season, kind.endpoint()),
        };
        self.get(kind.endpoint(), &path, 0).await
    }
}
