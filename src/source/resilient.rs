// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Sources wrapped in retry + circuit breaker.
//!
//! Each wrapper owns the policy for one upstream API, so a failing telemetry
//! API never opens the racing API's circuit.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use super::{RacingSource, TelemetrySource};
use crate::error::SyncError;
use crate::model::{SeasonId, StandingsKind};
use crate::resilience::policy::ResiliencePolicy;

pub struct ResilientRacingSource {
    inner: Arc<dyn RacingSource>,
    policy: ResiliencePolicy,
}

impl ResilientRacingSource {
    pub fn new(inner: Arc<dyn RacingSource>, policy: ResiliencePolicy) -> Self {
        Self { inner, policy }
    }

    #[must_use]
    pub fn policy(&self) -> &ResiliencePolicy {
        &self.policy
    }
}

#[async_trait]
impl RacingSource for ResilientRacingSource {
    async fn fetch_seasons(&self) -> Result<Value, SyncError> {
        self.policy.run("fetch_seasons", || self.inner.fetch_seasons()).await
    }

    async fn fetch_races(&self, season: &SeasonId) -> Result<Value, SyncError> {
        self.policy.run("fetch_races", || self.inner.fetch_races(season)).await
    }

    async fn fetch_race_results(&self, season: &SeasonId, round: u32) -> Result<Value, SyncError> {
        self.policy
            .run("fetch_race_results", || self.inner.fetch_race_results(season, round))
            .await
    }

    async fn fetch_qualifying(&self, season: &SeasonId, round: u32) -> Result<Value, SyncError> {
        self.policy
            .run("fetch_qualifying", || self.inner.fetch_qualifying(season, round))
            .await
    }

    async fn fetch_lap_times(
        &self,
        season: &SeasonId,
        round: u32,
    ) -> Result<Vec<Value>, SyncError> {
        self.policy
            .run("fetch_lap_times", || self.inner.fetch_lap_times(season, round))
            .await
    }

    async fn fetch_drivers(&self, season: &SeasonId) -> Result<Value, SyncError> {
        self.policy.run("fetch_drivers", || self.inner.fetch_drivers(season)).await
    }

    async fn fetch_constructors(&self, season: &SeasonId) -> Result<Value, SyncError> {
        self.policy
            .run("fetch_constructors", || self.inner.fetch_constructors(season))
            .await
    }

    async fn fetch_standings(
        &self,
        season: &SeasonId,
        kind: StandingsKind,
        round: Option<u32>,
    ) -> Result<Value, SyncError> {
        self.policy
            .run("fetch_standings", || self.inner.fetch_standings(season, kind, round))
            .await
    }
}

pub struct ResilientTelemetrySource {
    inner: Arc<dyn TelemetrySource>,
    policy: ResiliencePolicy,
}

impl ResilientTelemetrySource {
    pub fn new(inner: Arc<dyn TelemetrySource>, policy: ResiliencePolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl TelemetrySource for ResilientTelemetrySource {
    async fn fetch_sessions(&self, year: i32) -> Result<Value, SyncError> {
        self.policy.run("fetch_sessions", || self.inner.fetch_sessions(year)).await
    }

    async fn fetch_car_data(
        &self,
        session_key: u64,
        driver_number: u32,
    ) -> Result<Value, SyncError> {
        self.policy
            .run("fetch_car_data", || self.inner.fetch_car_data(session_key, driver_number))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::resilience::circuit_breaker::{CircuitBreaker, CircuitConfig, CircuitState};
    use crate::resilience::retry::RetryConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Fails every call with the configured error
    struct Failing {
        calls: AtomicUsize,
        error: SyncError,
    }

    #[async_trait]
    impl RacingSource for Failing {
        async fn fetch_seasons(&self) -> Result<Value, SyncError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(self.error.clone())
        }
        async fn fetch_races(&self, _: &SeasonId) -> Result<Value, SyncError> {
            self.fetch_seasons().await
        }
        async fn fetch_race_results(&self, _: &SeasonId, _: u32) -> Result<Value, SyncError> {
            self.fetch_seasons().await
        }
        async fn fetch_qualifying(&self, _: &SeasonId, _: u32) -> Result<Value, SyncError> {
            self.fetch_seasons().await
        }
        async fn fetch_lap_times(&self, _: &SeasonId, _: u32) -> Result<Vec<Value>, SyncError> {
            self.fetch_seasons().await.map(|v| vec![v])
        }
        async fn fetch_drivers(&self, _: &SeasonId) -> Result<Value, SyncError> {
            self.fetch_seasons().await
        }
        async fn fetch_constructors(&self, _: &SeasonId) -> Result<Value, SyncError> {
            self.fetch_seasons().await
        }
        async fn fetch_standings(
            &self,
            _: &SeasonId,
            _: StandingsKind,
            _: Option<u32>,
        ) -> Result<Value, SyncError> {
            self.fetch_seasons().await
        }
    }

    fn wrap(error: SyncError, threshold: u32) -> (Arc<Failing>, ResilientRacingSource) {
        let inner = Arc::new(Failing { calls: AtomicUsize::new(0), error });
        let breaker = Arc::new(CircuitBreaker::new(
            "racing_api",
            CircuitConfig {
                failure_threshold: threshold,
                recovery_timeout: Duration::from_secs(60),
            },
        ));
        let source = ResilientRacingSource::new(
            inner.clone(),
            ResiliencePolicy::new(RetryConfig::test(), breaker),
        );
        (inner, source)
    }

    #[tokio::test]
    async fn test_data_errors_are_not_retried() {
        let (inner, source) = wrap(SyncError::SourceData("404".into()), 5);
        let err = source.fetch_race_results(&SeasonId::from_year(2024), 30).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SourceData);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(source.policy().breaker().state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_unavailable_is_retried_then_trips() {
        let (inner, source) = wrap(SyncError::SourceUnavailable("503".into()), 5);
        let season = SeasonId::from_year(2024);

        // 3 attempts per call: first call spends 3 failures, second trips at 5
        assert!(source.fetch_races(&season).await.is_err());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
        let err = source.fetch_races(&season).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CircuitOpen);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 5);
        assert_eq!(source.policy().breaker().state(), CircuitState::Open);

        // Open circuit rejects without touching the source
        let err = source.fetch_drivers(&season).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CircuitOpen);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 5);
    }
}
