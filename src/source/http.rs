// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Single-GET JSON fetcher shared by the upstream clients.
//!
//! Failures are classified here and nowhere else:
//!
//! | condition | error |
//! |---|---|
//! | connect error, timeout, 5xx, 408, 429 | `SourceUnavailable` |
//! | 2xx with a body that is not JSON | `SourceUnavailable` |
//! | other 4xx (404, 400, 422, ...) | `SourceData` |
//!
//! No retries happen at this layer.

use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::error::SyncError;

/// Maximum error-body bytes echoed into an error message
const ERROR_BODY_PREVIEW: usize = 256;

#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    base_url: String,
    api: &'static str,
}

impl HttpFetcher {
    /// Build a fetcher with a per-request `timeout`.
    pub fn new(api: &'static str, base_url: &str, timeout: Duration) -> Result<Self, SyncError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("pitwall-sync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                SyncError::SourceUnavailable(format!("failed to build HTTP client: {}", e))
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api,
        })
    }

    #[must_use]
    pub fn api(&self) -> &'static str {
        self.api
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `{base_url}{path}` and parse the body as JSON.
    ///
    /// `endpoint` is a low-cardinality label used for metrics only.
    pub async fn get_json(
        &self,
        endpoint: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Value, SyncError> {
        let url = format!("{}{}", self.base_url, path);
        let start = Instant::now();
        let result = self.execute(&url, query).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(SyncError::SourceData(_)) => "data_error",
            Err(_) => "unavailable",
        };
        crate::metrics::record_source_request(self.api, endpoint, outcome);
        crate::metrics::record_source_latency(self.api, endpoint, start.elapsed());
        debug!(api = self.api, %url, outcome, elapsed_ms = start.elapsed().as_millis() as u64, "Upstream request");
        result
    }

    async fn execute(&self, url: &str, query: &[(&str, String)]) -> Result<Value, SyncError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| self.transport_error(url, &e))?;

        let status = response.status();
        if status.is_success() {
            let body = response.bytes().await.map_err(|e| self.transport_error(url, &e))?;
            return serde_json::from_slice(&body).map_err(|e| {
                SyncError::SourceUnavailable(format!(
                    "{}: malformed body from {}: {}",
                    self.api, url, e
                ))
            });
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_status(self.api, url, status, &body))
    }

    fn transport_error(&self, url: &str, err: &reqwest::Error) -> SyncError {
        if err.is_timeout() {
            SyncError::SourceUnavailable(format!("{}: request to {} timed out", self.api, url))
        } else {
            SyncError::SourceUnavailable(format!(
                "{}: request to {} failed: {}",
                self.api, url, err
            ))
        }
    }
}

fn classify_status(api: &str, url: &str, status: StatusCode, body: &str) -> SyncError {
    let preview: String = body.chars().take(ERROR_BODY_PREVIEW).collect();
    let message = format!("{}: {} returned {}: {}", api, url, status, preview.trim());
    if status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
    {
        SyncError::SourceUnavailable(message)
    } else {
        SyncError::SourceData(message)
    }
}
