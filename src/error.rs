// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Error taxonomy for ingestion, persistence and caching.
//!
//! Every failure in the crate is one of a small closed set of kinds so that
//! retry and fallback logic can match on [`ErrorKind`] instead of inspecting
//! messages:
//!
//! | kind | retried | trips breaker | typical origin |
//! |---|---|---|---|
//! | `SourceUnavailable` | yes | yes | timeout, 5xx, truncated body |
//! | `SourceData` | no | no | 404, unexpected payload shape |
//! | `CircuitOpen` | no | no | breaker rejected the call |
//! | `Validation` | no | no | malformed caller input |
//! | `Persistence` | no | no | SQL write/read failed |
//! | `Cache` | no | no | cache backend failed (downgraded to a miss) |
//! | `Timeout` | no | yes | sync run exceeded its deadline |

use std::time::Duration;

use crate::resilience::circuit_breaker::CircuitError;

/// Closed classification of [`SyncError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    SourceUnavailable,
    SourceData,
    CircuitOpen,
    Validation,
    Persistence,
    Cache,
    Timeout,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::SourceUnavailable => "source_unavailable",
            Self::SourceData => "source_data",
            Self::CircuitOpen => "circuit_open",
            Self::Validation => "validation",
            Self::Persistence => "persistence",
            Self::Cache => "cache",
            Self::Timeout => "timeout",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum SyncError {
    /// Transient upstream failure; safe to retry.
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    /// Permanent upstream failure (missing season/round, payload shape mismatch).
    #[error("source data error: {0}")]
    SourceData(String),

    #[error("circuit '{circuit}' open, request rejected")]
    CircuitOpen { circuit: String },

    #[error("{message} (received '{received}')")]
    Validation { message: String, received: String },

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("cache error: {0}")]
    Cache(String),

    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: String, after: Duration },
}

impl SyncError {
    pub fn validation(message: impl Into<String>, received: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            received: received.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SourceUnavailable(_) => ErrorKind::SourceUnavailable,
            Self::SourceData(_) => ErrorKind::SourceData,
            Self::CircuitOpen { .. } => ErrorKind::CircuitOpen,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Persistence(_) => ErrorKind::Persistence,
            Self::Cache(_) => ErrorKind::Cache,
            Self::Timeout { .. } => ErrorKind::Timeout,
        }
    }

    /// Only transient upstream failures are retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::SourceUnavailable(_))
    }

    /// Whether this failure counts against a circuit breaker.
    ///
    /// A permanent data error proves the dependency answered, so it counts as
    /// a healthy response.
    #[must_use]
    pub fn trips_breaker(&self) -> bool {
        matches!(self, Self::SourceUnavailable(_) | Self::Timeout { .. })
    }
}

impl From<CircuitError<SyncError>> for SyncError {
    fn from(err: CircuitError<SyncError>) -> Self {
        match err {
            CircuitError::Rejected { circuit } => SyncError::CircuitOpen { circuit },
            CircuitError::Inner(e) => e,
        }
    }
}

impl From<sqlx::Error> for SyncError {
    fn from(err: sqlx::Error) -> Self {
        SyncError::Persistence(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_unavailable_is_retryable() {
        assert!(SyncError::SourceUnavailable("503".into()).is_retryable());
        assert!(!SyncError::SourceData("404".into()).is_retryable());
        assert!(!SyncError::CircuitOpen { circuit: "racing".into() }.is_retryable());
        assert!(!SyncError::validation("bad season", "24").is_retryable());
        assert!(!SyncError::Persistence("locked".into()).is_retryable());
    }

    #[test]
    fn test_breaker_ignores_permanent_errors() {
        assert!(SyncError::SourceUnavailable("timeout".into()).trips_breaker());
        assert!(!SyncError::SourceData("no such round".into()).trips_breaker());
        assert!(!SyncError::Cache("redis down".into()).trips_breaker());
    }

    #[test]
    fn test_validation_message_echoes_input() {
        let err = SyncError::validation("season must be a 4-digit year", "20x4");
        assert_eq!(err.to_string(), "season must be a 4-digit year (received '20x4')");
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_circuit_rejection_converts_to_circuit_open() {
        let err: SyncError = CircuitError::Rejected { circuit: "telemetry".into() }.into();
        assert_eq!(err.kind(), ErrorKind::CircuitOpen);

        let err: SyncError = CircuitError::Inner(SyncError::SourceData("x".into())).into();
        assert_eq!(err.kind(), ErrorKind::SourceData);
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ErrorKind::SourceUnavailable.to_string(), "source_unavailable");
        assert_eq!(ErrorKind::Timeout.to_string(), "timeout");
    }
}
