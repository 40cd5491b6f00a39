// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Dependency-injected data service.
//!
//! [`F1DataService`] owns every collaborator explicitly: the store, the
//! cache, both upstream sources and the sync orchestrator. Nothing is held
//! in module-level state, so tests build isolated instances with
//! [`F1DataService::from_parts`].
//!
//! Read paths go cache → repository → upstream:
//!
//! ```text
//! races("2024") ─► CacheLayer::get_or_set("races:2024")
//!                     │ miss
//!                     ▼
//!                  Repository::list_races ──(empty)──► sync schedule from upstream
//! ```

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use crate::cache::{
    keys, CacheLayer, CacheStats, CacheStore, MemoryCacheStore, RedisCacheStore, TtlClass,
};
use crate::config::PitwallConfig;
use crate::error::SyncError;
use crate::model::{
    CarDataSample, Constructor, ConstructorStanding, Driver, DriverStanding, Race, Season, SeasonId,
    StandingsKind, StandingsSnapshot, SyncLog, TelemetrySession,
};
use crate::normalize;
use crate::resilience::circuit_breaker::{SourceCircuitMetrics, SourceCircuits};
use crate::resilience::policy::ResiliencePolicy;
use crate::source::{
    ErgastClient, OpenF1Client, RacingSource, ResilientRacingSource, ResilientTelemetrySource,
    TelemetrySource,
};
use crate::storage::{Repository, SqlOptions, SqlRepository};
use crate::sync::{RaceSyncReport, SeasonSyncReport, SyncOptions, SyncOrchestrator};

/// Liveness of each backend, as seen by [`F1DataService::health`].
#[derive(Debug, Clone)]
pub struct HealthReport {
    /// `None` when the store answered
    pub store_error: Option<String>,
    pub cache_error: Option<String>,
    pub cache_backend: &'static str,
    pub cache_stats: CacheStats,
    /// Breaker state per upstream API; absent for injected sources
    pub circuits: Option<SourceCircuitMetrics>,
}

impl HealthReport {
    /// The cache is best-effort, so only the store decides health.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.store_error.is_none()
    }
}

pub struct F1DataService {
    repo: Arc<dyn Repository>,
    sql: Option<Arc<SqlRepository>>,
    cache: Arc<CacheLayer>,
    racing: Arc<dyn RacingSource>,
    telemetry: Arc<dyn TelemetrySource>,
    circuits: Option<SourceCircuits>,
    orchestrator: SyncOrchestrator,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl F1DataService {
    /// Connect the store and cache and build the resilient upstream clients.
    ///
    /// `sql_url` is required. A Redis URL that cannot be reached downgrades
    /// to the in-process cache with a warning.
    #[instrument(skip(config), fields(has_redis = config.redis_url.is_some()))]
    pub async fn init(config: PitwallConfig) -> Result<Self, SyncError> {
        config.validate()?;
        let sql_url = config
            .sql_url
            .as_deref()
            .ok_or_else(|| SyncError::validation("sql_url is required", ""))?;

        let sql = Arc::new(
            SqlRepository::new(
                sql_url,
                SqlOptions {
                    max_connections: config.db_max_connections,
                    statement_timeout: config.db_statement_timeout(),
                    batch_size: config.bulk_batch_size,
                },
            )
            .await?,
        );
        crate::metrics::set_backend_healthy("sql", true);

        let policy = config.ttl_policy();
        let (store, sweeper) = Self::connect_cache(&config).await;
        let cache = Arc::new(CacheLayer::new(store, policy));

        let circuits = SourceCircuits::new(config.circuit_config());
        let retry = config.retry_config();
        let racing: Arc<dyn RacingSource> = Arc::new(ResilientRacingSource::new(
            Arc::new(ErgastClient::new(&config.racing_api_url, config.source_timeout())?),
            ResiliencePolicy::new(retry.clone(), circuits.racing.clone()),
        ));
        let telemetry: Arc<dyn TelemetrySource> = Arc::new(ResilientTelemetrySource::new(
            Arc::new(OpenF1Client::new(&config.telemetry_api_url, config.source_timeout())?),
            ResiliencePolicy::new(retry, circuits.telemetry.clone()),
        ));

        let repo: Arc<dyn Repository> = sql.clone();
        let orchestrator = SyncOrchestrator::new(
            racing.clone(),
            repo.clone(),
            cache.clone(),
            config.sync_options(),
        );

        info!(
            cache = cache.backend(),
            racing_api = %config.racing_api_url,
            concurrency = config.sync_concurrency,
            "Data service ready"
        );

        Ok(Self {
            repo,
            sql: Some(sql),
            cache,
            racing,
            telemetry,
            circuits: Some(circuits),
            orchestrator,
            sweeper: Mutex::new(sweeper),
        })
    }

    async fn connect_cache(
        config: &PitwallConfig,
    ) -> (Arc<dyn CacheStore>, Option<JoinHandle<()>>) {
        let retention = Duration::from_secs(config.stale_retention_secs);
        if let Some(url) = config.redis_url.as_deref() {
            match RedisCacheStore::new(url, &config.redis_prefix, retention).await {
                Ok(store) => {
                    crate::metrics::set_backend_healthy("redis", true);
                    return (Arc::new(store) as Arc<dyn CacheStore>, None);
                }
                Err(e) => {
                    crate::metrics::set_backend_healthy("redis", false);
                    warn!(error = %e, "Redis unavailable, using in-process cache");
                }
            }
        }

        let store = Arc::new(MemoryCacheStore::new(retention));
        let interval = Duration::from_secs(config.cache_sweep_interval_secs);
        let sweeper = (config.cache_sweep_interval_secs > 0)
            .then(|| MemoryCacheStore::spawn_sweeper(store.clone(), interval));
        (store as Arc<dyn CacheStore>, sweeper)
    }

    /// Assemble a service from pre-built collaborators (tests, embedding).
    pub fn from_parts(
        racing: Arc<dyn RacingSource>,
        telemetry: Arc<dyn TelemetrySource>,
        repo: Arc<dyn Repository>,
        cache: Arc<CacheLayer>,
        options: SyncOptions,
    ) -> Self {
        let orchestrator =
            SyncOrchestrator::new(racing.clone(), repo.clone(), cache.clone(), options);
        Self {
            repo,
            sql: None,
            cache,
            racing,
            telemetry,
            circuits: None,
            orchestrator,
            sweeper: Mutex::new(None),
        }
    }

    /// Stop the cache sweeper and close the connection pool. Safe to call twice.
    pub async fn close(&self) {
        if let Some(handle) = self.sweeper.lock().take() {
            handle.abort();
        }
        if let Some(sql) = &self.sql {
            sql.close().await;
        }
        info!("Data service closed");
    }

    #[must_use]
    pub fn orchestrator(&self) -> &SyncOrchestrator {
        &self.orchestrator
    }

    #[must_use]
    pub fn cache(&self) -> &CacheLayer {
        &self.cache
    }

    #[must_use]
    pub fn repository(&self) -> &Arc<dyn Repository> {
        &self.repo
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Read paths
    // ═══════════════════════════════════════════════════════════════════════

    pub async fn seasons(&self) -> Result<Vec<Season>, SyncError> {
        let ttl = self.cache.policy().ttl(TtlClass::Static);
        self.cache
            .get_or_set(&keys::seasons(), ttl, || async {
                let stored = self.repo.list_seasons().await?;
                if !stored.is_empty() {
                    return Ok(stored);
                }
                let raw = self.racing.fetch_seasons().await?;
                let seasons = normalize::seasons(&raw, self.cache.policy().current_year())?;
                self.repo.upsert_seasons(&seasons).await?;
                Ok(seasons)
            })
            .await
    }

    /// Race calendar for `season` (a 4-digit year, validated before any I/O).
    pub async fn races(&self, season: &str) -> Result<Vec<Race>, SyncError> {
        let season = SeasonId::parse(season)?;
        let ttl = self.cache.policy().for_season(&season);
        self.cache
            .get_or_set(&keys::races(&season), ttl, || async {
                let stored = self.repo.list_races(&season).await?;
                if !stored.is_empty() {
                    return Ok(stored);
                }
                Ok(self.orchestrator.sync_schedule(&season).await?.races)
            })
            .await
    }

    pub async fn race(&self, season: &str, round: u32) -> Result<Race, SyncError> {
        let season = SeasonId::parse(season)?;
        if round == 0 {
            return Err(SyncError::validation("round must be at least 1", "0"));
        }
        let ttl = self.cache.policy().for_season(&season);
        self.cache
            .get_or_set(&keys::race(&season, round), ttl, || async {
                if let Some(race) = self.repo.get_race(&season, round).await? {
                    return Ok(race);
                }
                self.orchestrator.sync_schedule(&season).await?;
                self.repo
                    .get_race(&season, round)
                    .await?
                    .ok_or_else(|| {
                        SyncError::SourceData(format!("season {} has no round {}", season, round))
                    })
            })
            .await
    }

    /// Latest standings table; `kind` is `driver` or `constructor`.
    pub async fn standings(
        &self,
        season: &str,
        kind: &str,
    ) -> Result<StandingsSnapshot, SyncError> {
        let season = SeasonId::parse(season)?;
        let kind = StandingsKind::parse(kind)?;
        let ttl = self.cache.policy().for_season(&season);
        self.cache
            .get_or_set(&keys::standings(&season, kind), ttl, || async {
                if let Some(snapshot) = self.stored_standings(&season, kind).await? {
                    return Ok(snapshot);
                }
                let raw = self.racing.fetch_standings(&season, kind, None).await?;
                let snapshot = normalize::standings(&raw, &season, kind)?.ok_or_else(|| {
                    SyncError::SourceData(format!("no {} standings for season {}", kind, season))
                })?;
                match &snapshot {
                    StandingsSnapshot::Driver { rows, .. } => {
                        self.repo.upsert_driver_standings(rows).await?
                    }
                    StandingsSnapshot::Constructor { rows, .. } => {
                        self.repo.upsert_constructor_standings(rows).await?
                    }
                };
                Ok(snapshot)
            })
            .await
    }

    async fn stored_standings(
        &self,
        season: &SeasonId,
        kind: StandingsKind,
    ) -> Result<Option<StandingsSnapshot>, SyncError> {
        let snapshot = match kind {
            StandingsKind::Driver => {
                let rows: Vec<DriverStanding> =
                    self.repo.list_driver_standings(season, None).await?;
                let round = rows.first().map(|r| round_of(&r.race_id));
                round.map(|round| StandingsSnapshot::Driver { round, rows })
            }
            StandingsKind::Constructor => {
                let rows: Vec<ConstructorStanding> =
                    self.repo.list_constructor_standings(season, None).await?;
                let round = rows.first().map(|r| round_of(&r.race_id));
                round.map(|round| StandingsSnapshot::Constructor { round, rows })
            }
        };
        Ok(snapshot)
    }

    /// Season roster, refreshed from upstream and written through to the store.
    pub async fn drivers(&self, season: &str) -> Result<Vec<Driver>, SyncError> {
        let season = SeasonId::parse(season)?;
        let ttl = self.cache.policy().ttl(TtlClass::Static);
        self.cache
            .get_or_set(&keys::drivers(&season), ttl, || async {
                let raw = self.racing.fetch_drivers(&season).await?;
                let drivers = normalize::drivers(&raw, self.cache.policy().is_current(&season))?;
                self.repo.upsert_drivers(&drivers).await?;
                Ok(drivers)
            })
            .await
    }

    pub async fn constructors(&self, season: &str) -> Result<Vec<Constructor>, SyncError> {
        let season = SeasonId::parse(season)?;
        let ttl = self.cache.policy().ttl(TtlClass::Static);
        self.cache
            .get_or_set(&keys::constructors(&season), ttl, || async {
                let raw = self.racing.fetch_constructors(&season).await?;
                let constructors =
                    normalize::constructors(&raw, self.cache.policy().is_current(&season))?;
                self.repo.upsert_constructors(&constructors).await?;
                Ok(constructors)
            })
            .await
    }

    /// Telemetry is cached under the realtime class and never persisted.
    pub async fn telemetry_sessions(&self, year: i32) -> Result<Vec<TelemetrySession>, SyncError> {
        let ttl = self.cache.policy().ttl(TtlClass::Realtime);
        self.cache
            .get_or_set(&keys::telemetry_sessions(year), ttl, || async {
                let raw = self.telemetry.fetch_sessions(year).await?;
                normalize::telemetry_sessions(&raw)
            })
            .await
    }

    pub async fn car_data(
        &self,
        session_key: u64,
        driver_number: u32,
    ) -> Result<Vec<CarDataSample>, SyncError> {
        let ttl = self.cache.policy().ttl(TtlClass::Realtime);
        self.cache
            .get_or_set(&keys::car_data(session_key, driver_number), ttl, || async {
                let raw = self.telemetry.fetch_car_data(session_key, driver_number).await?;
                normalize::car_data(&raw)
            })
            .await
    }

    pub async fn sync_log(&self, id: &str) -> Result<Option<SyncLog>, SyncError> {
        self.repo.get_sync_log(id).await
    }

    pub async fn sync_logs(
        &self,
        season: Option<&str>,
        limit: usize,
    ) -> Result<Vec<SyncLog>, SyncError> {
        let season = season.map(SeasonId::parse).transpose()?;
        self.repo.list_sync_logs(season.as_ref(), limit).await
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Sync entry points
    // ═══════════════════════════════════════════════════════════════════════

    pub async fn sync_season(&self, season: &str) -> Result<SeasonSyncReport, SyncError> {
        let season = SeasonId::parse(season)?;
        self.orchestrator.sync_season(&season).await
    }

    pub async fn sync_race(&self, season: &str, round: u32) -> Result<RaceSyncReport, SyncError> {
        let season = SeasonId::parse(season)?;
        self.orchestrator.sync_race(&season, round).await
    }

    pub async fn sync_standings(
        &self,
        season: &str,
        round: Option<u32>,
    ) -> Result<usize, SyncError> {
        let season = SeasonId::parse(season)?;
        self.orchestrator.sync_standings(&season, round).await
    }

    pub async fn sync_seasons(&self) -> Result<usize, SyncError> {
        self.orchestrator.sync_seasons().await
    }

    pub async fn health(&self) -> HealthReport {
        let store_error = self.repo.ping().await.err().map(|e| e.to_string());
        let cache_error = self.cache.ping().await.err().map(|e| e.to_string());
        crate::metrics::set_backend_healthy("sql", store_error.is_none());
        crate::metrics::set_backend_healthy(self.cache.backend(), cache_error.is_none());
        if let Some(e) = &store_error {
            warn!(error = %e, "Store health check failed");
        }

        HealthReport {
            store_error,
            cache_error,
            cache_backend: self.cache.backend(),
            cache_stats: self.cache.stats(),
            circuits: self.circuits.as_ref().map(SourceCircuits::metrics),
        }
    }
}

/// Round number from a `{season}-{round:02}` race id.
fn round_of(race_id: &str) -> u32 {
    race_id
        .rsplit('-')
        .next()
        .and_then(|r| r.parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::TtlPolicy;
    use crate::error::ErrorKind;
    use crate::storage::MemoryRepository;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct StubRacing {
        race_calls: AtomicUsize,
        fail: bool,
    }

    fn schedule_payload() -> Value {
        json!({"MRData": {"total": "2", "limit": "100", "offset": "0", "RaceTable": {"season": "2023", "Races": [
            {"season": "2023", "round": "1", "raceName": "Bahrain Grand Prix", "date": "2023-03-05",
             "Circuit": {"circuitId": "bahrain", "circuitName": "Bahrain International Circuit",
                         "Location": {"locality": "Sakhir", "country": "Bahrain", "lat": "26.0325", "long": "50.5106"}}},
            {"season": "2023", "round": "2", "raceName": "Saudi Arabian Grand Prix", "date": "2023-03-19",
             "Circuit": {"circuitId": "jeddah", "circuitName": "Jeddah Corniche Circuit",
                         "Location": {"locality": "Jeddah", "country": "Saudi Arabia", "lat": "21.6319", "long": "39.1044"}}}
        ]}}})
    }

    #[async_trait]
    impl RacingSource for StubRacing {
        async fn fetch_seasons(&self) -> Result<Value, SyncError> {
            Err(SyncError::SourceData("not stubbed".into()))
        }
        async fn fetch_races(&self, _season: &SeasonId) -> Result<Value, SyncError> {
            self.race_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(SyncError::SourceUnavailable("503".into()));
            }
            Ok(schedule_payload())
        }
        async fn fetch_race_results(&self, _s: &SeasonId, _r: u32) -> Result<Value, SyncError> {
            Err(SyncError::SourceData("not stubbed".into()))
        }
        async fn fetch_qualifying(&self, _s: &SeasonId, _r: u32) -> Result<Value, SyncError> {
            Err(SyncError::SourceData("not stubbed".into()))
        }
        async fn fetch_lap_times(&self, _s: &SeasonId, _r: u32) -> Result<Vec<Value>, SyncError> {
            Ok(Vec::new())
        }
        async fn fetch_drivers(&self, _s: &SeasonId) -> Result<Value, SyncError> {
            Err(SyncError::SourceData("not stubbed".into()))
        }
        async fn fetch_constructors(&self, _s: &SeasonId) -> Result<Value, SyncError> {
            Err(SyncError::SourceData("not stubbed".into()))
        }
        async fn fetch_standings(
            &self,
            _s: &SeasonId,
            _k: StandingsKind,
            _r: Option<u32>,
        ) -> Result<Value, SyncError> {
            Err(SyncError::SourceData("not stubbed".into()))
        }
    }

    struct NoTelemetry;

    #[async_trait]
    impl TelemetrySource for NoTelemetry {
        async fn fetch_sessions(&self, _year: i32) -> Result<Value, SyncError> {
            Ok(json!([]))
        }
        async fn fetch_car_data(&self, _s: u64, _d: u32) -> Result<Value, SyncError> {
            Ok(json!([]))
        }
    }

    fn service(racing: Arc<StubRacing>) -> (F1DataService, Arc<MemoryRepository>) {
        let repo = Arc::new(MemoryRepository::new());
        let policy = TtlPolicy { current_season: Some(2024), ..TtlPolicy::default() };
        let cache = Arc::new(CacheLayer::new(Arc::new(MemoryCacheStore::default()), policy));
        let options = SyncOptions { current_season: Some(2024), ..SyncOptions::default() };
        let svc =
            F1DataService::from_parts(racing, Arc::new(NoTelemetry), repo.clone(), cache, options);
        (svc, repo)
    }

    #[test]
    fn test_round_of_race_id() {
        assert_eq!(round_of("2024-05"), 5);
        assert_eq!(round_of("2024-21"), 21);
        assert_eq!(round_of("garbage"), 0);
    }

    #[tokio::test]
    async fn test_malformed_season_rejected_before_io() {
        let racing = Arc::new(StubRacing::default());
        let (svc, _) = service(racing.clone());

        let err = svc.races("24").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("24"));
        assert_eq!(racing.race_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_races_fall_back_to_upstream_and_persist() {
        let racing = Arc::new(StubRacing::default());
        let (svc, repo) = service(racing.clone());

        let races = svc.races("2023").await.unwrap();
        assert_eq!(races.len(), 2);
        assert_eq!(repo.race_count(), 2);
        assert_eq!(racing.race_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_races_served_from_store_without_upstream() {
        let racing = Arc::new(StubRacing { fail: true, ..StubRacing::default() });
        let (svc, repo) = service(racing.clone());
        let schedule = normalize::schedule(&schedule_payload()).unwrap();
        repo.upsert_season(&Season::new(SeasonId::from_year(2023), false)).await.unwrap();
        repo.upsert_circuits(&schedule.circuits).await.unwrap();
        repo.upsert_races(&schedule.races).await.unwrap();

        let races = svc.races("2023").await.unwrap();
        assert_eq!(races.len(), 2);
        assert_eq!(racing.race_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_upstream_failure_with_empty_store_propagates() {
        let racing = Arc::new(StubRacing { fail: true, ..StubRacing::default() });
        let (svc, _) = service(racing);

        let err = svc.races("2023").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SourceUnavailable);
    }

    #[tokio::test]
    async fn test_missing_round_is_source_data() {
        let racing = Arc::new(StubRacing::default());
        let (svc, _) = service(racing);

        let err = svc.race("2023", 9).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SourceData);
        assert_eq!(svc.race("2023", 2).await.unwrap().name, "Saudi Arabian Grand Prix");
    }

    #[tokio::test]
    async fn test_health_reports_store_and_cache() {
        let (svc, _) = service(Arc::new(StubRacing::default()));

        let health = svc.health().await;
        assert!(health.is_healthy());
        assert!(health.cache_error.is_none());
        assert_eq!(health.cache_backend, "memory");
        assert!(health.circuits.is_none());
        svc.close().await;
    }
}
