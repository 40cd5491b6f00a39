// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Response envelope and error → HTTP status mapping.
//!
//! The web layer itself lives outside this crate. These types fix the
//! contract it serves: every response is an [`ApiEnvelope`], and every
//! [`SyncError`] maps to exactly one status code.
//!
//! | error kind | status | message |
//! |---|---|---|
//! | `Validation` | 400 | echoes the received value |
//! | `SourceData` | 404 | generic |
//! | `SourceUnavailable`, `CircuitOpen`, `Timeout` | 503 | generic |
//! | `Persistence` | 503 | generic |
//! | `Cache` | 500 | generic |
//!
//! ```
//! use pitwall_sync::api::{respond, ApiError};
//! use pitwall_sync::SeasonId;
//!
//! let (status, body) = respond(SeasonId::parse("24"));
//! assert_eq!(status, 400);
//! assert!(!body.success);
//! assert!(body.message.unwrap().contains("'24'"));
//!
//! assert_eq!(ApiError::method_not_allowed("DELETE").status, 405);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, warn};

use crate::error::{ErrorKind, SyncError};
use crate::service::HealthReport;

/// `{ data, success, message, timestamp, metadata }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub data: Option<T>,
    pub success: bool,
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl<T> ApiEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            data: Some(data),
            success: true,
            message: None,
            timestamp: Utc::now(),
            metadata: None,
        }
    }

    pub fn failure(err: &ApiError) -> Self {
        Self {
            data: None,
            success: false,
            message: Some(err.message.clone()),
            timestamp: Utc::now(),
            metadata: Some(serde_json::json!({ "code": err.code })),
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// A client-safe error: status, stable code and a message with no internals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiError {
    pub status: u16,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn method_not_allowed(method: &str) -> Self {
        Self {
            status: 405,
            code: "METHOD_NOT_ALLOWED",
            message: format!("method {} is not supported", method),
        }
    }

    fn unavailable(message: &str) -> Self {
        Self {
            status: 503,
            code: "SERVICE_UNAVAILABLE",
            message: message.to_string(),
        }
    }
}

/// Status code for an error kind.
#[must_use]
pub fn status_for(kind: ErrorKind) -> u16 {
    match kind {
        ErrorKind::Validation => 400,
        ErrorKind::SourceData => 404,
        ErrorKind::SourceUnavailable
        | ErrorKind::CircuitOpen
        | ErrorKind::Timeout
        | ErrorKind::Persistence => 503,
        ErrorKind::Cache => 500,
    }
}

impl From<&SyncError> for ApiError {
    fn from(err: &SyncError) -> Self {
        let status = status_for(err.kind());
        match err.kind() {
            ErrorKind::Validation => Self {
                status,
                code: "BAD_REQUEST",
                message: err.to_string(),
            },
            ErrorKind::SourceData => {
                warn!(error = %err, "Upstream has no data for request");
                Self {
                    status,
                    code: "NOT_FOUND",
                    message: "requested data not found".to_string(),
                }
            }
            ErrorKind::Persistence => Self::unavailable("data store unavailable"),
            ErrorKind::SourceUnavailable | ErrorKind::CircuitOpen | ErrorKind::Timeout => {
                Self::unavailable("upstream data source unavailable")
            }
            ErrorKind::Cache => {
                error!(error = %err, "Unexpected error reached the API boundary");
                Self {
                    status,
                    code: "INTERNAL_ERROR",
                    message: "internal server error".to_string(),
                }
            }
        }
    }
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        Self::from(&err)
    }
}

/// Wrap a service result into `(status, envelope)`.
pub fn respond<T>(result: Result<T, SyncError>) -> (u16, ApiEnvelope<T>) {
    match result {
        Ok(data) => (200, ApiEnvelope::ok(data)),
        Err(e) => {
            let api = ApiError::from(&e);
            (api.status, ApiEnvelope::failure(&api))
        }
    }
}

/// 200 while the store answers, 503 otherwise.
#[must_use]
pub fn health_status(report: &HealthReport) -> u16 {
    if report.is_healthy() {
        200
    } else {
        503
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheStats;

    #[test]
    fn test_validation_echoes_received_value() {
        let err = SyncError::validation("season must be a 4-digit year", "20x4");
        let api = ApiError::from(&err);
        assert_eq!(api.status, 400);
        assert!(api.message.contains("20x4"));
    }

    #[test]
    fn test_store_failure_is_503_without_detail() {
        let err = SyncError::Persistence("pool timed out on mysql://root:secret@db".into());
        let api = ApiError::from(err);
        assert_eq!(api.status, 503);
        assert!(!api.message.contains("secret"));
    }

    #[test]
    fn test_status_table() {
        assert_eq!(status_for(ErrorKind::SourceData), 404);
        assert_eq!(status_for(ErrorKind::CircuitOpen), 503);
        assert_eq!(status_for(ErrorKind::SourceUnavailable), 503);
        assert_eq!(status_for(ErrorKind::Timeout), 503);
        assert_eq!(status_for(ErrorKind::Cache), 500);
    }

    #[test]
    fn test_internal_error_hides_message() {
        let api = ApiError::from(SyncError::Cache("redis://internal-host:6379 refused".into()));
        assert_eq!(api.status, 500);
        assert_eq!(api.message, "internal server error");
    }

    #[test]
    fn test_envelope_shape() {
        let (status, body) = respond(Ok(vec![1, 2, 3]));
        assert_eq!(status, 200);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"], serde_json::json!([1, 2, 3]));
        assert!(json["timestamp"].is_string());
        assert!(json.get("metadata").is_none());

        let body = body.with_metadata(serde_json::json!({"season": "2024"}));
        assert_eq!(body.metadata.unwrap()["season"], "2024");
    }

    #[test]
    fn test_failure_envelope_carries_code() {
        let (status, body) =
            respond::<()>(Err(SyncError::SourceData("season 1900 not found".into())));
        assert_eq!(status, 404);
        assert!(body.data.is_none());
        assert_eq!(body.metadata.unwrap()["code"], "NOT_FOUND");
    }

    #[test]
    fn test_not_found_hides_upstream_url_and_body() {
        let err = SyncError::SourceData(
            "GET https://api.example.test/ergast/f1/1900.json returned 404: <html>Not Found</html>".into(),
        );
        let api = ApiError::from(&err);
        assert_eq!(api.status, 404);
        assert_eq!(api.message, "requested data not found");
        assert!(!api.message.contains("https://"));
        assert!(!api.message.contains("<html>"));
    }

    #[test]
    fn test_health_status() {
        let mut report = HealthReport {
            store_error: None,
            cache_error: Some("down".into()),
            cache_backend: "redis",
            cache_stats: CacheStats::default(),
            circuits: None,
        };
        assert_eq!(health_status(&report), 200);
        report.store_error = Some("connection refused".into());
        assert_eq!(health_status(&report), 503);
    }
}
