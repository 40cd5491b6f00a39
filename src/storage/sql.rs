// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! SQL repository over sqlx's `Any` driver (SQLite or MySQL).
//!
//! Upserts are multi-row `INSERT ... ON CONFLICT` (SQLite) or
//! `INSERT ... ON DUPLICATE KEY UPDATE` (MySQL) statements of up to
//! [`STATEMENT_CHUNK`] rows. Conflict resolution is server-side, so
//! concurrent writers of the same row converge without read-modify-write.
//!
//! ## sqlx Any Driver Quirks
//!
//! The `Any` driver returns MySQL TEXT/LONGTEXT columns as BLOB, so every
//! text column is read as `String` first and `Vec<u8>` second. Unsigned
//! integers are bound as `i64`.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use sqlx::any::{AnyArguments, AnyPoolOptions, AnyRow};
use sqlx::query::Query;
use sqlx::{Any, AnyPool, Row};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Once;
use std::time::Duration;
use tracing::{error, info};

use super::schema;
use super::traits::{BulkWriteReport, Repository, STATEMENT_CHUNK};
use crate::error::SyncError;
use crate::metrics::LatencyTimer;
use crate::model::{
    now_millis, Circuit, Constructor, ConstructorStanding, Driver, DriverStanding, LapTime,
    QualifyingResult, Race, RaceResult, RaceStatus, Season, SeasonId, SyncLog, SyncOutcome,
    SyncStatus, SyncType,
};
use crate::resilience::retry::{retry, retry_if, RetryConfig};

// SQLx `Any` driver requires runtime installation
static INSTALL_DRIVERS: Once = Once::new();

fn install_drivers() {
    INSTALL_DRIVERS.call_once(|| {
        sqlx::any::install_default_drivers();
    });
}

type AnyQuery<'q> = Query<'q, Any, AnyArguments<'q>>;

/// Pool and write tuning for [`SqlRepository`].
#[derive(Debug, Clone)]
pub struct SqlOptions {
    pub max_connections: u32,
    pub statement_timeout: Duration,
    /// Rows per transaction for entity upserts
    pub batch_size: usize,
}

impl Default for SqlOptions {
    fn default() -> Self {
        Self {
            max_connections: 10,
            statement_timeout: Duration::from_secs(30),
            batch_size: 5000,
        }
    }
}

pub struct SqlRepository {
    pool: AnyPool,
    is_sqlite: bool,
    options: SqlOptions,
}

impl SqlRepository {
    /// Connect with startup-mode retry (fails fast if config is wrong) and create the schema.
    pub async fn new(connection_string: &str, options: SqlOptions) -> Result<Self, SyncError> {
        install_drivers();

        let is_sqlite = connection_string.starts_with("sqlite:");
        if !is_sqlite && !connection_string.starts_with("mysql:") {
            return Err(SyncError::validation(
                "sql_url must be a sqlite: or mysql: connection string",
                connection_string.split('@').last().unwrap_or_default(),
            ));
        }

        let pool = retry("sql_connect", &RetryConfig::startup(), || async {
            AnyPoolOptions::new()
                .max_connections(options.max_connections.max(1))
                .acquire_timeout(Duration::from_secs(10))
                .idle_timeout(Duration::from_secs(300))
                .connect(connection_string)
                .await
                .map_err(|e| SyncError::Persistence(e.to_string()))
        })
        .await?;

        let repo = Self { pool, is_sqlite, options };

        // WAL lets readers proceed while a batch transaction is open
        if is_sqlite {
            repo.enable_wal_mode().await?;
        }

        repo.init_schema().await?;
        info!(backend = if is_sqlite { "sqlite" } else { "mysql" }, "SQL repository ready");
        Ok(repo)
    }

    /// Get a clone of the connection pool.
    pub fn pool(&self) -> AnyPool {
        self.pool.clone()
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn enable_wal_mode(&self) -> Result<(), SyncError> {
        sqlx::query("PRAGMA journal_mode = WAL")
            .execute(&self.pool)
            .await
            .map_err(|e| SyncError::Persistence(format!("Failed to enable WAL mode: {}", e)))?;
        sqlx::query("PRAGMA synchronous = NORMAL")
            .execute(&self.pool)
            .await
            .map_err(|e| SyncError::Persistence(format!("Failed to set synchronous mode: {}", e)))?;
        Ok(())
    }

    async fn init_schema(&self) -> Result<(), SyncError> {
        let statements = if self.is_sqlite { schema::SQLITE } else { schema::MYSQL };
        for sql in statements {
            retry("sql_init_schema", &RetryConfig::startup(), || async {
                sqlx::query(sql)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| SyncError::Persistence(e.to_string()))
            })
            .await?;
        }
        Ok(())
    }

    /// Run one statement (or transaction) under the statement timeout,
    /// retrying only transient driver errors.
    async fn run<T, F, Fut>(&self, operation: &'static str, op: F) -> Result<T, SyncError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, sqlx::Error>>,
    {
        let _timer = LatencyTimer::new(operation);
        let timeout = self.options.statement_timeout;
        let config = RetryConfig::query();
        let attempt = retry_if(operation, &config, is_transient, op);
        match tokio::time::timeout(timeout, attempt).await {
            Ok(result) => {
                result.map_err(|e| SyncError::Persistence(format!("{}: {}", operation, e)))
            }
            Err(_) => Err(SyncError::Persistence(format!(
                "{} exceeded statement timeout of {:?}",
                operation, timeout
            ))),
        }
    }

    /// Write one batch in its own transaction.
    async fn write_batch<R: SqlRow>(&self, upsert: &Upsert, rows: &[R]) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        for row in rows {
            if let Some(pre) = row.pre_statement() {
                pre.execute(&mut *tx).await?;
            }
        }
        for chunk in rows.chunks(STATEMENT_CHUNK) {
            let sql = upsert.sql(chunk.len(), self.is_sqlite);
            let mut query = sqlx::query(sql.as_str());
            for row in chunk {
                query = row.bind(query);
            }
            query.execute(&mut *tx).await?;
        }
        tx.commit().await
    }

    async fn upsert_rows<R: SqlRow>(
        &self,
        operation: &'static str,
        upsert: &Upsert,
        rows: &[R],
        batch_size: usize,
    ) -> Result<BulkWriteReport, SyncError> {
        let mut report = BulkWriteReport::default();
        if rows.is_empty() {
            return Ok(report);
        }
        let batch_size = batch_size.max(1);
        let total_batches = rows.len().div_ceil(batch_size);

        for (index, batch) in rows.chunks(batch_size).enumerate() {
            match self.run(operation, || self.write_batch(upsert, batch)).await {
                Ok(()) => {
                    report.rows += batch.len();
                    report.batches += 1;
                    crate::metrics::record_batch(upsert.table, true);
                }
                Err(e) => {
                    crate::metrics::record_batch(upsert.table, false);
                    crate::metrics::record_rows_written(upsert.table, report.rows);
                    error!(
                        table = upsert.table,
                        batch = index + 1,
                        of = total_batches,
                        committed_rows = report.rows,
                        error = %e,
                        "Bulk write batch failed"
                    );
                    return Err(SyncError::Persistence(format!(
                        "{}: batch {} of {} failed after {} rows committed: {}",
                        upsert.table,
                        index + 1,
                        total_batches,
                        report.rows,
                        e
                    )));
                }
            }
        }
        crate::metrics::record_rows_written(upsert.table, report.rows);
        Ok(report)
    }

    async fn fetch_all(
        &self,
        operation: &'static str,
        sql: &str,
        binds: &[Bind<'_>],
    ) -> Result<Vec<AnyRow>, SyncError> {
        self.run(operation, || bind_all(sqlx::query(sql), binds).fetch_all(&self.pool)).await
    }

    async fn fetch_optional(
        &self,
        operation: &'static str,
        sql: &str,
        binds: &[Bind<'_>],
    ) -> Result<Option<AnyRow>, SyncError> {
        self.run(operation, || bind_all(sqlx::query(sql), binds).fetch_optional(&self.pool)).await
    }

    async fn execute(
        &self,
        operation: &'static str,
        sql: &str,
        binds: &[Bind<'_>],
    ) -> Result<u64, SyncError> {
        self.run(operation, || async {
            bind_all(sqlx::query(sql), binds)
                .execute(&self.pool)
                .await
                .map(|r| r.rows_affected())
        })
        .await
    }

    async fn count(
        &self,
        operation: &'static str,
        sql: &str,
        binds: &[Bind<'_>],
    ) -> Result<u64, SyncError> {
        let row = self
            .fetch_optional(operation, sql, binds)
            .await?
            .ok_or_else(|| SyncError::Persistence(format!("{}: no row returned", operation)))?;
        let cnt: i64 = row.try_get("cnt")?;
        Ok(cnt.max(0) as u64)
    }
}

fn is_transient(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::WorkerCrashed => true,
        // SQLITE_BUSY / SQLITE_LOCKED, MySQL lock wait timeout / deadlock
        sqlx::Error::Database(db) => db
            .code()
            .is_some_and(|c| matches!(c.as_ref(), "5" | "6" | "1205" | "1213")),
        _ => false,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Statement building
// ═══════════════════════════════════════════════════════════════════════════

/// A value bound to a read/update statement.
#[derive(Debug, Clone, Copy)]
enum Bind<'a> {
    Text(&'a str),
    OptText(Option<&'a str>),
    Int(i64),
    OptInt(Option<i64>),
    Real(f64),
}

fn bind_all<'q>(mut query: AnyQuery<'q>, binds: &[Bind<'q>]) -> AnyQuery<'q> {
    for b in binds {
        query = match *b {
            Bind::Text(v) => query.bind(v),
            Bind::OptText(v) => query.bind(v),
            Bind::Int(v) => query.bind(v),
            Bind::OptInt(v) => query.bind(v),
            Bind::Real(v) => query.bind(v),
        };
    }
    query
}

/// Multi-row insert template for one table.
struct Upsert {
    table: &'static str,
    columns: &'static [&'static str],
    sqlite_tail: &'static str,
    mysql_verb: &'static str,
    mysql_tail: &'static str,
}

impl Upsert {
    fn sql(&self, rows: usize, is_sqlite: bool) -> String {
        let one = format!("({})", vec!["?"; self.columns.len()].join(", "));
        let values = vec![one; rows].join(", ");
        let (verb, tail) = if is_sqlite {
            ("INSERT", self.sqlite_tail)
        } else {
            (self.mysql_verb, self.mysql_tail)
        };
        let columns = self.columns.join(", ");
        format!("{} INTO {} ({}) VALUES {} {}", verb, self.table, columns, values, tail)
    }
}

/// A row that can bind itself into a multi-row insert.
trait SqlRow: Sync {
    fn bind<'q>(&'q self, query: AnyQuery<'q>) -> AnyQuery<'q>;

    /// Statement executed in the same transaction before the insert.
    fn pre_statement(&self) -> Option<AnyQuery<'_>> {
        None
    }
}

/// A model row paired with the write timestamp.
struct Stamped<'a, T> {
    row: &'a T,
    now: i64,
}

fn stamp<T>(rows: &[T]) -> Vec<Stamped<'_, T>> {
    let now = now_millis();
    rows.iter().map(|row| Stamped { row, now }).collect()
}

fn flag(v: bool) -> i64 {
    i64::from(v)
}

fn opt_u32(v: Option<u32>) -> Option<i64> {
    v.map(i64::from)
}

fn date_str(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

const SEASONS: Upsert = Upsert {
    table: "seasons",
    columns: &["id", "year", "name", "completeness", "is_active", "created_at", "updated_at"],
    sqlite_tail: "ON CONFLICT(id) DO UPDATE SET \
        name = excluded.name, \
        is_active = excluded.is_active, \
        updated_at = excluded.updated_at",
    mysql_verb: "INSERT",
    mysql_tail: "ON DUPLICATE KEY UPDATE \
        name = VALUES(name), \
        is_active = VALUES(is_active), \
        updated_at = VALUES(updated_at)",
};

impl SqlRow for Stamped<'_, Season> {
    fn bind<'q>(&'q self, q: AnyQuery<'q>) -> AnyQuery<'q> {
        let s = self.row;
        q.bind(s.id.as_str())
            .bind(i64::from(s.year))
            .bind(s.name.as_str())
            .bind(s.completeness)
            .bind(flag(s.is_active))
            .bind(self.now)
            .bind(self.now)
    }
}

const CIRCUITS: Upsert = Upsert {
    table: "circuits",
    columns: &["id", "name", "locality", "country", "latitude", "longitude", "url", "created_at"],
    sqlite_tail: "ON CONFLICT(id) DO NOTHING",
    mysql_verb: "INSERT IGNORE",
    mysql_tail: "",
};

impl SqlRow for Stamped<'_, Circuit> {
    fn bind<'q>(&'q self, q: AnyQuery<'q>) -> AnyQuery<'q> {
        let c = self.row;
        q.bind(c.id.as_str())
            .bind(c.name.as_str())
            .bind(c.locality.as_str())
            .bind(c.country.as_str())
            .bind(c.latitude)
            .bind(c.longitude)
            .bind(c.url.as_deref())
            .bind(self.now)
    }
}

const CONSTRUCTORS: Upsert = Upsert {
    table: "constructors",
    columns: &["id", "name", "nationality", "url", "is_active", "created_at", "updated_at"],
    sqlite_tail: "ON CONFLICT(id) DO UPDATE SET \
        name = excluded.name, \
        nationality = COALESCE(excluded.nationality, constructors.nationality), \
        url = COALESCE(excluded.url, constructors.url), \
        is_active = MAX(constructors.is_active, excluded.is_active), \
        updated_at = excluded.updated_at",
    mysql_verb: "INSERT",
    mysql_tail: "ON DUPLICATE KEY UPDATE \
        name = VALUES(name), \
        nationality = COALESCE(VALUES(nationality), nationality), \
        url = COALESCE(VALUES(url), url), \
        is_active = GREATEST(is_active, VALUES(is_active)), \
        updated_at = VALUES(updated_at)",
};

impl SqlRow for Stamped<'_, Constructor> {
    fn bind<'q>(&'q self, q: AnyQuery<'q>) -> AnyQuery<'q> {
        let c = self.row;
        q.bind(c.id.as_str())
            .bind(c.name.as_str())
            .bind(c.nationality.as_deref())
            .bind(c.url.as_deref())
            .bind(flag(c.is_active))
            .bind(self.now)
            .bind(self.now)
    }
}

const DRIVERS: Upsert = Upsert {
    table: "drivers",
    columns: &[
        "id", "code", "permanent_number", "given_name", "family_name", "full_name",
        "date_of_birth", "nationality", "url", "is_active", "created_at", "updated_at",
    ],
    sqlite_tail: "ON CONFLICT(id) DO UPDATE SET \
        code = COALESCE(excluded.code, drivers.code), \
        permanent_number = COALESCE(excluded.permanent_number, drivers.permanent_number), \
        given_name = excluded.given_name, \
        family_name = excluded.family_name, \
        full_name = excluded.full_name, \
        date_of_birth = COALESCE(excluded.date_of_birth, drivers.date_of_birth), \
        nationality = COALESCE(excluded.nationality, drivers.nationality), \
        url = COALESCE(excluded.url, drivers.url), \
        is_active = MAX(drivers.is_active, excluded.is_active), \
        updated_at = excluded.updated_at",
    mysql_verb: "INSERT",
    mysql_tail: "ON DUPLICATE KEY UPDATE \
        code = COALESCE(VALUES(code), code), \
        permanent_number = COALESCE(VALUES(permanent_number), permanent_number), \
        given_name = VALUES(given_name), \
        family_name = VALUES(family_name), \
        full_name = VALUES(full_name), \
        date_of_birth = COALESCE(VALUES(date_of_birth), date_of_birth), \
        nationality = COALESCE(VALUES(nationality), nationality), \
        url = COALESCE(VALUES(url), url), \
        is_active = GREATEST(is_active, VALUES(is_active)), \
        updated_at = VALUES(updated_at)",
};

struct DriverRow<'a> {
    driver: &'a Driver,
    /// `None` when a later row in the same write claims this code.
    code: Option<&'a str>,
    date_of_birth: Option<String>,
    now: i64,
}

impl SqlRow for DriverRow<'_> {
    fn bind<'q>(&'q self, q: AnyQuery<'q>) -> AnyQuery<'q> {
        let d = self.driver;
        q.bind(d.id.as_str())
            .bind(self.code)
            .bind(opt_u32(d.permanent_number))
            .bind(d.given_name.as_str())
            .bind(d.family_name.as_str())
            .bind(d.full_name.as_str())
            .bind(self.date_of_birth.as_deref())
            .bind(d.nationality.as_deref())
            .bind(d.url.as_deref())
            .bind(flag(d.is_active))
            .bind(self.now)
            .bind(self.now)
    }

    /// Codes are unique: a code reused by a later driver moves to them.
    fn pre_statement(&self) -> Option<AnyQuery<'_>> {
        let code = self.code?;
        Some(
            sqlx::query("UPDATE drivers SET code = NULL WHERE code = ? AND id <> ?")
                .bind(code)
                .bind(self.driver.id.as_str()),
        )
    }
}

const RACES: Upsert = Upsert {
    table: "races",
    columns: &[
        "id", "season_id", "circuit_id", "round", "name", "date", "time", "qualifying_date",
        "sprint_date", "status", "url", "race_results", "qualifying_results", "created_at",
        "updated_at",
    ],
    sqlite_tail: "ON CONFLICT(id) DO UPDATE SET \
        circuit_id = excluded.circuit_id, \
        name = excluded.name, \
        date = excluded.date, \
        time = COALESCE(excluded.time, races.time), \
        qualifying_date = COALESCE(excluded.qualifying_date, races.qualifying_date), \
        sprint_date = COALESCE(excluded.sprint_date, races.sprint_date), \
        status = CASE WHEN races.status = 'completed' THEN 'completed' ELSE excluded.status END, \
        url = COALESCE(excluded.url, races.url), \
        race_results = COALESCE(excluded.race_results, races.race_results), \
        qualifying_results = COALESCE(excluded.qualifying_results, races.qualifying_results), \
        updated_at = excluded.updated_at",
    mysql_verb: "INSERT",
    mysql_tail: "ON DUPLICATE KEY UPDATE \
        circuit_id = VALUES(circuit_id), \
        name = VALUES(name), \
        date = VALUES(date), \
        time = COALESCE(VALUES(time), time), \
        qualifying_date = COALESCE(VALUES(qualifying_date), qualifying_date), \
        sprint_date = COALESCE(VALUES(sprint_date), sprint_date), \
        status = IF(status = 'completed', 'completed', VALUES(status)), \
        url = COALESCE(VALUES(url), url), \
        race_results = COALESCE(VALUES(race_results), race_results), \
        qualifying_results = COALESCE(VALUES(qualifying_results), qualifying_results), \
        updated_at = VALUES(updated_at)",
};

struct RaceRow<'a> {
    race: &'a Race,
    date: String,
    qualifying_date: Option<String>,
    sprint_date: Option<String>,
    race_results: Option<String>,
    qualifying_results: Option<String>,
    now: i64,
}

impl<'a> RaceRow<'a> {
    fn prepare(race: &'a Race, now: i64) -> Result<Self, SyncError> {
        Ok(Self {
            race,
            date: date_str(race.date),
            qualifying_date: race.qualifying_date.map(date_str),
            sprint_date: race.sprint_date.map(date_str),
            race_results: race.race_results.as_ref().map(to_json).transpose()?,
            qualifying_results: race.qualifying_results.as_ref().map(to_json).transpose()?,
            now,
        })
    }
}

impl SqlRow for RaceRow<'_> {
    fn bind<'q>(&'q self, q: AnyQuery<'q>) -> AnyQuery<'q> {
        let r = self.race;
        q.bind(r.id.as_str())
            .bind(r.season_id.as_str())
            .bind(r.circuit_id.as_str())
            .bind(i64::from(r.round))
            .bind(r.name.as_str())
            .bind(self.date.as_str())
            .bind(r.time.as_deref())
            .bind(self.qualifying_date.as_deref())
            .bind(self.sprint_date.as_deref())
            .bind(r.status.as_str())
            .bind(r.url.as_deref())
            .bind(self.race_results.as_deref())
            .bind(self.qualifying_results.as_deref())
            .bind(self.now)
            .bind(self.now)
    }
}

const LAP_TIMES: Upsert = Upsert {
    table: "lap_times",
    columns: &["race_id", "lap", "driver_id", "position", "time_text", "millis"],
    sqlite_tail: "ON CONFLICT(race_id, lap, driver_id) DO UPDATE SET \
        position = excluded.position, \
        time_text = excluded.time_text, \
        millis = excluded.millis",
    mysql_verb: "INSERT",
    mysql_tail: "ON DUPLICATE KEY UPDATE \
        position = VALUES(position), \
        time_text = VALUES(time_text), \
        millis = VALUES(millis)",
};

impl SqlRow for LapTime {
    fn bind<'q>(&'q self, q: AnyQuery<'q>) -> AnyQuery<'q> {
        q.bind(self.race_id.as_str())
            .bind(i64::from(self.lap))
            .bind(self.driver_id.as_str())
            .bind(opt_u32(self.position))
            .bind(self.time_text.as_str())
            .bind(self.millis.and_then(|m| i64::try_from(m).ok()))
    }
}

const DRIVER_STANDINGS: Upsert = Upsert {
    table: "driver_standings",
    columns: &[
        "season_id", "race_id", "driver_id", "constructor_id", "position", "position_text",
        "points", "wins", "podiums", "fastest_laps", "dnfs", "updated_at",
    ],
    sqlite_tail: "ON CONFLICT(season_id, race_id, driver_id) DO UPDATE SET \
        constructor_id = excluded.constructor_id, \
        position = excluded.position, \
        position_text = excluded.position_text, \
        points = excluded.points, \
        wins = excluded.wins, \
        podiums = excluded.podiums, \
        fastest_laps = excluded.fastest_laps, \
        dnfs = excluded.dnfs, \
        updated_at = excluded.updated_at",
    mysql_verb: "INSERT",
    mysql_tail: "ON DUPLICATE KEY UPDATE \
        constructor_id = VALUES(constructor_id), \
        position = VALUES(position), \
        position_text = VALUES(position_text), \
        points = VALUES(points), \
        wins = VALUES(wins), \
        podiums = VALUES(podiums), \
        fastest_laps = VALUES(fastest_laps), \
        dnfs = VALUES(dnfs), \
        updated_at = VALUES(updated_at)",
};

impl SqlRow for Stamped<'_, DriverStanding> {
    fn bind<'q>(&'q self, q: AnyQuery<'q>) -> AnyQuery<'q> {
        let s = self.row;
        q.bind(s.season_id.as_str())
            .bind(s.race_id.as_str())
            .bind(s.driver_id.as_str())
            .bind(s.constructor_id.as_deref())
            .bind(opt_u32(s.position))
            .bind(s.position_text.as_str())
            .bind(s.points)
            .bind(i64::from(s.wins))
            .bind(i64::from(s.podiums))
            .bind(i64::from(s.fastest_laps))
            .bind(i64::from(s.dnfs))
            .bind(self.now)
    }
}

const CONSTRUCTOR_STANDINGS: Upsert = Upsert {
    table: "constructor_standings",
    columns: &[
        "season_id", "race_id", "constructor_id", "position", "position_text", "points", "wins",
        "podiums", "fastest_laps", "dnfs", "updated_at",
    ],
    sqlite_tail: "ON CONFLICT(season_id, race_id, constructor_id) DO UPDATE SET \
        position = excluded.position, \
        position_text = excluded.position_text, \
        points = excluded.points, \
        wins = excluded.wins, \
        podiums = excluded.podiums, \
        fastest_laps = excluded.fastest_laps, \
        dnfs = excluded.dnfs, \
        updated_at = excluded.updated_at",
    mysql_verb: "INSERT",
    mysql_tail: "ON DUPLICATE KEY UPDATE \
        position = VALUES(position), \
        position_text = VALUES(position_text), \
        points = VALUES(points), \
        wins = VALUES(wins), \
        podiums = VALUES(podiums), \
        fastest_laps = VALUES(fastest_laps), \
        dnfs = VALUES(dnfs), \
        updated_at = VALUES(updated_at)",
};

impl SqlRow for Stamped<'_, ConstructorStanding> {
    fn bind<'q>(&'q self, q: AnyQuery<'q>) -> AnyQuery<'q> {
        let s = self.row;
        q.bind(s.season_id.as_str())
            .bind(s.race_id.as_str())
            .bind(s.constructor_id.as_str())
            .bind(opt_u32(s.position))
            .bind(s.position_text.as_str())
            .bind(s.points)
            .bind(i64::from(s.wins))
            .bind(i64::from(s.podiums))
            .bind(i64::from(s.fastest_laps))
            .bind(i64::from(s.dnfs))
            .bind(self.now)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Row decoding
// ═══════════════════════════════════════════════════════════════════════════

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, SyncError> {
    serde_json::to_string(value)
        .map_err(|e| SyncError::Persistence(format!("failed to encode payload: {}", e)))
}

fn from_json<T: DeserializeOwned>(column: &str, raw: &str) -> Result<T, SyncError> {
    serde_json::from_str(raw)
        .map_err(|e| SyncError::Persistence(format!("corrupt {} payload: {}", column, e)))
}

fn text(row: &AnyRow, column: &str) -> Result<String, SyncError> {
    match row.try_get::<String, _>(column) {
        Ok(s) => Ok(s),
        Err(_) => {
            let bytes: Vec<u8> = row.try_get(column)?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
    }
}

fn opt_text(row: &AnyRow, column: &str) -> Result<Option<String>, SyncError> {
    match row.try_get::<Option<String>, _>(column) {
        Ok(s) => Ok(s),
        Err(_) => {
            let bytes: Option<Vec<u8>> = row.try_get(column)?;
            Ok(bytes.map(|b| String::from_utf8_lossy(&b).into_owned()))
        }
    }
}

fn int(row: &AnyRow, column: &str) -> Result<i64, SyncError> {
    Ok(row.try_get::<i64, _>(column)?)
}

fn opt_int(row: &AnyRow, column: &str) -> Result<Option<i64>, SyncError> {
    Ok(row.try_get::<Option<i64>, _>(column)?)
}

fn narrow(column: &str, v: i64) -> Result<u32, SyncError> {
    u32::try_from(v).map_err(|_| SyncError::Persistence(format!("{} out of range: {}", column, v)))
}

fn small(row: &AnyRow, column: &str) -> Result<u32, SyncError> {
    narrow(column, int(row, column)?)
}

fn opt_small(row: &AnyRow, column: &str) -> Result<Option<u32>, SyncError> {
    opt_int(row, column)?.map(|v| narrow(column, v)).transpose()
}

fn count_col(row: &AnyRow, column: &str) -> Result<u64, SyncError> {
    Ok(int(row, column)?.max(0) as u64)
}

fn parse_date(column: &str, raw: &str) -> Result<NaiveDate, SyncError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| SyncError::Persistence(format!("corrupt {}: '{}'", column, raw)))
}

fn season_id(row: &AnyRow, column: &str) -> Result<SeasonId, SyncError> {
    let raw = text(row, column)?;
    SeasonId::parse(&raw)
        .map_err(|_| SyncError::Persistence(format!("corrupt {}: '{}'", column, raw)))
}

fn season_from_row(row: &AnyRow) -> Result<Season, SyncError> {
    Ok(Season {
        id: season_id(row, "id")?,
        year: i32::try_from(int(row, "year")?).unwrap_or_default(),
        name: text(row, "name")?,
        completeness: row.try_get::<f64, _>("completeness")?,
        is_active: int(row, "is_active")? != 0,
    })
}

fn circuit_from_row(row: &AnyRow) -> Result<Circuit, SyncError> {
    Ok(Circuit {
        id: text(row, "id")?,
        name: text(row, "name")?,
        locality: text(row, "locality")?,
        country: text(row, "country")?,
        latitude: row.try_get::<Option<f64>, _>("latitude")?,
        longitude: row.try_get::<Option<f64>, _>("longitude")?,
        url: opt_text(row, "url")?,
    })
}

fn constructor_from_row(row: &AnyRow) -> Result<Constructor, SyncError> {
    Ok(Constructor {
        id: text(row, "id")?,
        name: text(row, "name")?,
        nationality: opt_text(row, "nationality")?,
        url: opt_text(row, "url")?,
        is_active: int(row, "is_active")? != 0,
    })
}

fn driver_from_row(row: &AnyRow) -> Result<Driver, SyncError> {
    Ok(Driver {
        id: text(row, "id")?,
        code: opt_text(row, "code")?,
        permanent_number: opt_small(row, "permanent_number")?,
        given_name: text(row, "given_name")?,
        family_name: text(row, "family_name")?,
        full_name: text(row, "full_name")?,
        date_of_birth: opt_text(row, "date_of_birth")?
            .map(|d| parse_date("date_of_birth", &d))
            .transpose()?,
        nationality: opt_text(row, "nationality")?,
        url: opt_text(row, "url")?,
        is_active: int(row, "is_active")? != 0,
    })
}

fn race_from_row(row: &AnyRow) -> Result<Race, SyncError> {
    let status_raw = text(row, "status")?;
    let status = RaceStatus::parse(&status_raw)
        .ok_or_else(|| SyncError::Persistence(format!("corrupt race status: '{}'", status_raw)))?;
    let opt_date = |column: &str| -> Result<Option<NaiveDate>, SyncError> {
        opt_text(row, column)?.map(|d| parse_date(column, &d)).transpose()
    };
    Ok(Race {
        id: text(row, "id")?,
        season_id: season_id(row, "season_id")?,
        circuit_id: text(row, "circuit_id")?,
        round: small(row, "round")?,
        name: text(row, "name")?,
        date: parse_date("date", &text(row, "date")?)?,
        time: opt_text(row, "time")?,
        qualifying_date: opt_date("qualifying_date")?,
        sprint_date: opt_date("sprint_date")?,
        status,
        url: opt_text(row, "url")?,
        race_results: opt_text(row, "race_results")?
            .map(|raw| from_json("race_results", &raw))
            .transpose()?,
        qualifying_results: opt_text(row, "qualifying_results")?
            .map(|raw| from_json("qualifying_results", &raw))
            .transpose()?,
    })
}

fn driver_standing_from_row(row: &AnyRow) -> Result<DriverStanding, SyncError> {
    Ok(DriverStanding {
        season_id: season_id(row, "season_id")?,
        race_id: text(row, "race_id")?,
        driver_id: text(row, "driver_id")?,
        constructor_id: opt_text(row, "constructor_id")?,
        position: opt_small(row, "position")?,
        position_text: text(row, "position_text")?,
        points: row.try_get::<f64, _>("points")?,
        wins: small(row, "wins")?,
        podiums: small(row, "podiums")?,
        fastest_laps: small(row, "fastest_laps")?,
        dnfs: small(row, "dnfs")?,
    })
}

fn constructor_standing_from_row(row: &AnyRow) -> Result<ConstructorStanding, SyncError> {
    Ok(ConstructorStanding {
        season_id: season_id(row, "season_id")?,
        race_id: text(row, "race_id")?,
        constructor_id: text(row, "constructor_id")?,
        position: opt_small(row, "position")?,
        position_text: text(row, "position_text")?,
        points: row.try_get::<f64, _>("points")?,
        wins: small(row, "wins")?,
        podiums: small(row, "podiums")?,
        fastest_laps: small(row, "fastest_laps")?,
        dnfs: small(row, "dnfs")?,
    })
}

fn sync_log_from_row(row: &AnyRow) -> Result<SyncLog, SyncError> {
    let type_raw = text(row, "sync_type")?;
    let status_raw = text(row, "status")?;
    Ok(SyncLog {
        id: text(row, "id")?,
        sync_type: SyncType::parse(&type_raw)
            .ok_or_else(|| SyncError::Persistence(format!("corrupt sync_type: '{}'", type_raw)))?,
        season_id: opt_text(row, "season_id")?
            .map(|s| SeasonId::parse(&s))
            .transpose()
            .map_err(|e| SyncError::Persistence(e.to_string()))?,
        round: opt_small(row, "round")?,
        status: SyncStatus::parse(&status_raw)
            .ok_or_else(|| {
                SyncError::Persistence(format!("corrupt sync status: '{}'", status_raw))
            })?,
        records_processed: count_col(row, "records_processed")?,
        records_failed: count_col(row, "records_failed")?,
        duration_ms: opt_int(row, "duration_ms")?.map(|v| v.max(0) as u64),
        error: opt_text(row, "error")?,
        started_at: int(row, "started_at")?,
        completed_at: opt_int(row, "completed_at")?,
    })
}

const SEASON_COLS: &str = "id, year, name, completeness, is_active";
const CIRCUIT_COLS: &str = "id, name, locality, country, latitude, longitude, url";
const CONSTRUCTOR_COLS: &str = "id, name, nationality, url, is_active";
const DRIVER_COLS: &str =
    "id, code, permanent_number, given_name, family_name, full_name, date_of_birth, nationality, url, is_active";
const RACE_COLS: &str = "id, season_id, circuit_id, round, name, date, time, qualifying_date, sprint_date, \
     status, url, race_results, qualifying_results";
const DRIVER_STANDING_COLS: &str = "season_id, race_id, driver_id, constructor_id, position, position_text, \
     points, wins, podiums, fastest_laps, dnfs";
const CONSTRUCTOR_STANDING_COLS: &str = "season_id, race_id, constructor_id, position, position_text, \
     points, wins, podiums, fastest_laps, dnfs";
const SYNC_LOG_COLS: &str = "id, sync_type, season_id, round, status, records_processed, records_failed, \
     duration_ms, error, started_at, completed_at";
const STANDINGS_ORDER: &str = "ORDER BY CASE WHEN position IS NULL THEN 1 ELSE 0 END, position, points DESC";

fn decode_all<T>(
    rows: Vec<AnyRow>,
    f: fn(&AnyRow) -> Result<T, SyncError>,
) -> Result<Vec<T>, SyncError> {
    rows.iter().map(f).collect()
}

// ═══════════════════════════════════════════════════════════════════════════
// Repository
// ═══════════════════════════════════════════════════════════════════════════

#[async_trait]
impl Repository for SqlRepository {
    async fn ping(&self) -> Result<(), SyncError> {
        let result = self.fetch_optional("ping", "SELECT 1 AS one", &[]).await.map(|_| ());
        crate::metrics::set_backend_healthy("sql", result.is_ok());
        result
    }

    async fn upsert_seasons(&self, seasons: &[Season]) -> Result<BulkWriteReport, SyncError> {
        let rows = stamp(seasons);
        self.upsert_rows("upsert_seasons", &SEASONS, &rows, self.options.batch_size).await
    }

    async fn get_season(&self, id: &SeasonId) -> Result<Option<Season>, SyncError> {
        let sql = format!("SELECT {} FROM seasons WHERE id = ?", SEASON_COLS);
        self.fetch_optional("get_season", &sql, &[Bind::Text(id.as_str())])
            .await?
            .as_ref()
            .map(season_from_row)
            .transpose()
    }

    async fn list_seasons(&self) -> Result<Vec<Season>, SyncError> {
        let sql = format!("SELECT {} FROM seasons ORDER BY year DESC", SEASON_COLS);
        decode_all(self.fetch_all("list_seasons", &sql, &[]).await?, season_from_row)
    }

    async fn upsert_circuits(&self, circuits: &[Circuit]) -> Result<BulkWriteReport, SyncError> {
        let rows = stamp(circuits);
        self.upsert_rows("upsert_circuits", &CIRCUITS, &rows, self.options.batch_size).await
    }

    async fn get_circuit(&self, id: &str) -> Result<Option<Circuit>, SyncError> {
        let sql = format!("SELECT {} FROM circuits WHERE id = ?", CIRCUIT_COLS);
        self.fetch_optional("get_circuit", &sql, &[Bind::Text(id)])
            .await?
            .as_ref()
            .map(circuit_from_row)
            .transpose()
    }

    async fn upsert_constructors(
        &self,
        constructors: &[Constructor],
    ) -> Result<BulkWriteReport, SyncError> {
        let rows = stamp(constructors);
        self.upsert_rows("upsert_constructors", &CONSTRUCTORS, &rows, self.options.batch_size).await
    }

    async fn get_constructor(&self, id: &str) -> Result<Option<Constructor>, SyncError> {
        let sql = format!("SELECT {} FROM constructors WHERE id = ?", CONSTRUCTOR_COLS);
        self.fetch_optional("get_constructor", &sql, &[Bind::Text(id)])
            .await?
            .as_ref()
            .map(constructor_from_row)
            .transpose()
    }

    async fn list_constructors(&self, active_only: bool) -> Result<Vec<Constructor>, SyncError> {
        let filter = if active_only { "WHERE is_active = 1 " } else { "" };
        let sql = format!("SELECT {} FROM constructors {}ORDER BY name", CONSTRUCTOR_COLS, filter);
        decode_all(self.fetch_all("list_constructors", &sql, &[]).await?, constructor_from_row)
    }

    async fn upsert_drivers(&self, drivers: &[Driver]) -> Result<BulkWriteReport, SyncError> {
        let now = now_millis();
        // The last row carrying a code keeps it, as if rows were applied in order
        let holders: HashMap<&str, &str> = drivers
            .iter()
            .filter_map(|d| Some((d.code.as_deref()?, d.id.as_str())))
            .collect();
        let rows: Vec<DriverRow<'_>> = drivers
            .iter()
            .map(|driver| DriverRow {
                driver,
                code: driver
                    .code
                    .as_deref()
                    .filter(|code| holders.get(code) == Some(&driver.id.as_str())),
                date_of_birth: driver.date_of_birth.map(date_str),
                now,
            })
            .collect();
        self.upsert_rows("upsert_drivers", &DRIVERS, &rows, self.options.batch_size).await
    }

    async fn get_driver(&self, id: &str) -> Result<Option<Driver>, SyncError> {
        let sql = format!("SELECT {} FROM drivers WHERE id = ?", DRIVER_COLS);
        self.fetch_optional("get_driver", &sql, &[Bind::Text(id)])
            .await?
            .as_ref()
            .map(driver_from_row)
            .transpose()
    }

    async fn list_drivers(&self, active_only: bool) -> Result<Vec<Driver>, SyncError> {
        let filter = if active_only { "WHERE is_active = 1 " } else { "" };
        let sql = format!(
            "SELECT {} FROM drivers {}ORDER BY family_name, given_name",
            DRIVER_COLS, filter
        );
        decode_all(self.fetch_all("list_drivers", &sql, &[]).await?, driver_from_row)
    }

    async fn upsert_races(&self, races: &[Race]) -> Result<BulkWriteReport, SyncError> {
        let now = now_millis();
        let rows = races
            .iter()
            .map(|r| RaceRow::prepare(r, now))
            .collect::<Result<Vec<_>, _>>()?;
        self.upsert_rows("upsert_races", &RACES, &rows, self.options.batch_size).await
    }

    async fn get_race(&self, season: &SeasonId, round: u32) -> Result<Option<Race>, SyncError> {
        let sql = format!("SELECT {} FROM races WHERE season_id = ? AND round = ?", RACE_COLS);
        let binds = [Bind::Text(season.as_str()), Bind::Int(i64::from(round))];
        self.fetch_optional("get_race", &sql, &binds)
            .await?
            .as_ref()
            .map(race_from_row)
            .transpose()
    }

    async fn list_races(&self, season: &SeasonId) -> Result<Vec<Race>, SyncError> {
        let sql = format!("SELECT {} FROM races WHERE season_id = ? ORDER BY round", RACE_COLS);
        decode_all(
            self.fetch_all("list_races", &sql, &[Bind::Text(season.as_str())]).await?,
            race_from_row,
        )
    }

    async fn record_race_results(
        &self,
        season: &SeasonId,
        round: u32,
        results: &[RaceResult],
    ) -> Result<bool, SyncError> {
        if results.is_empty() {
            return Ok(false);
        }
        let payload = to_json(&results)?;
        let affected = self
            .execute(
                "record_race_results",
                "UPDATE races SET race_results = ?, status = 'completed', updated_at = ? \
                 WHERE season_id = ? AND round = ?",
                &[
                    Bind::Text(&payload),
                    Bind::Int(now_millis()),
                    Bind::Text(season.as_str()),
                    Bind::Int(i64::from(round)),
                ],
            )
            .await?;
        crate::metrics::record_rows_written("races", affected as usize);
        Ok(affected > 0)
    }

    async fn record_qualifying_results(
        &self,
        season: &SeasonId,
        round: u32,
        results: &[QualifyingResult],
    ) -> Result<bool, SyncError> {
        if results.is_empty() {
            return Ok(false);
        }
        let payload = to_json(&results)?;
        let affected = self
            .execute(
                "record_qualifying_results",
                "UPDATE races SET qualifying_results = ?, updated_at = ? WHERE season_id = ? AND round = ?",
                &[
                    Bind::Text(&payload),
                    Bind::Int(now_millis()),
                    Bind::Text(season.as_str()),
                    Bind::Int(i64::from(round)),
                ],
            )
            .await?;
        Ok(affected > 0)
    }

    async fn insert_lap_times(
        &self,
        laps: &[LapTime],
        batch_size: usize,
    ) -> Result<BulkWriteReport, SyncError> {
        self.upsert_rows("insert_lap_times", &LAP_TIMES, laps, batch_size).await
    }

    async fn count_lap_times(&self, race_id: &str) -> Result<u64, SyncError> {
        self.count(
            "count_lap_times",
            "SELECT COUNT(*) AS cnt FROM lap_times WHERE race_id = ?",
            &[Bind::Text(race_id)],
        )
        .await
    }

    async fn upsert_driver_standings(
        &self,
        rows: &[DriverStanding],
    ) -> Result<BulkWriteReport, SyncError> {
        let rows = stamp(rows);
        let batch_size = self.options.batch_size;
        self.upsert_rows("upsert_driver_standings", &DRIVER_STANDINGS, &rows, batch_size)
            .await
    }

    async fn upsert_constructor_standings(
        &self,
        rows: &[ConstructorStanding],
    ) -> Result<BulkWriteReport, SyncError> {
        let rows = stamp(rows);
        self.upsert_rows(
            "upsert_constructor_standings",
            &CONSTRUCTOR_STANDINGS,
            &rows,
            self.options.batch_size,
        )
        .await
    }

    async fn list_driver_standings(
        &self,
        season: &SeasonId,
        race_id: Option<&str>,
    ) -> Result<Vec<DriverStanding>, SyncError> {
        let rows = match race_id {
            Some(race) => {
                let sql = format!(
                    "SELECT {} FROM driver_standings WHERE season_id = ? AND race_id = ? {}",
                    DRIVER_STANDING_COLS, STANDINGS_ORDER
                );
                let binds = [Bind::Text(season.as_str()), Bind::Text(race)];
                self.fetch_all("list_driver_standings", &sql, &binds).await?
            }
            None => {
                let sql = format!(
                    "SELECT {} FROM driver_standings WHERE season_id = ? AND race_id = \
                     (SELECT MAX(race_id) FROM driver_standings WHERE season_id = ?) {}",
                    DRIVER_STANDING_COLS, STANDINGS_ORDER
                );
                self.fetch_all(
                    "list_driver_standings",
                    &sql,
                    &[Bind::Text(season.as_str()), Bind::Text(season.as_str())],
                )
                .await?
            }
        };
        decode_all(rows, driver_standing_from_row)
    }

    async fn list_constructor_standings(
        &self,
        season: &SeasonId,
        race_id: Option<&str>,
    ) -> Result<Vec<ConstructorStanding>, SyncError> {
        let rows = match race_id {
            Some(race) => {
                let sql = format!(
                    "SELECT {} FROM constructor_standings WHERE season_id = ? AND race_id = ? {}",
                    CONSTRUCTOR_STANDING_COLS, STANDINGS_ORDER
                );
                self.fetch_all(
                    "list_constructor_standings",
                    &sql,
                    &[Bind::Text(season.as_str()), Bind::Text(race)],
                )
                .await?
            }
            None => {
                let sql = format!(
                    "SELECT {} FROM constructor_standings WHERE season_id = ? AND race_id = \
                     (SELECT MAX(race_id) FROM constructor_standings WHERE season_id = ?) {}",
                    CONSTRUCTOR_STANDING_COLS, STANDINGS_ORDER
                );
                self.fetch_all(
                    "list_constructor_standings",
                    &sql,
                    &[Bind::Text(season.as_str()), Bind::Text(season.as_str())],
                )
                .await?
            }
        };
        decode_all(rows, constructor_standing_from_row)
    }

    async fn recompute_completeness(&self, season: &SeasonId) -> Result<f64, SyncError> {
        let row = self
            .fetch_optional(
                "recompute_completeness",
                "SELECT \
                   (SELECT COUNT(*) FROM races WHERE season_id = ? AND status <> 'cancelled') AS total, \
                   (SELECT COUNT(*) FROM races WHERE season_id = ? AND status = 'completed') AS completed",
                &[Bind::Text(season.as_str()), Bind::Text(season.as_str())],
            )
            .await?
            .ok_or_else(|| {
                SyncError::Persistence("recompute_completeness: no row returned".into())
            })?;
        let total = count_col(&row, "total")?;
        let completed = count_col(&row, "completed")?;
        let completeness = crate::model::calculate_completeness(completed, total);

        self.execute(
            "update_completeness",
            "UPDATE seasons SET completeness = ?, updated_at = ? WHERE id = ?",
            &[Bind::Real(completeness), Bind::Int(now_millis()), Bind::Text(season.as_str())],
        )
        .await?;
        Ok(completeness)
    }

    async fn start_sync_log(&self, log: &SyncLog) -> Result<(), SyncError> {
        let sql = format!(
            "INSERT INTO data_sync_logs ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            SYNC_LOG_COLS
        );
        self.execute(
            "start_sync_log",
            &sql,
            &[
                Bind::Text(&log.id),
                Bind::Text(log.sync_type.as_str()),
                Bind::OptText(log.season_id.as_ref().map(SeasonId::as_str)),
                Bind::OptInt(opt_u32(log.round)),
                Bind::Text(log.status.as_str()),
                Bind::Int(log.records_processed as i64),
                Bind::Int(log.records_failed as i64),
                Bind::OptInt(log.duration_ms.map(|d| d as i64)),
                Bind::OptText(log.error.as_deref()),
                Bind::Int(log.started_at),
                Bind::OptInt(log.completed_at),
            ],
        )
        .await
        .map(|_| ())
    }

    async fn finish_sync_log(&self, id: &str, outcome: &SyncOutcome) -> Result<bool, SyncError> {
        if outcome.status == SyncStatus::Started {
            return Err(SyncError::validation(
                "a sync log can only finish as completed or failed",
                "started",
            ));
        }
        let affected = self
            .execute(
                "finish_sync_log",
                "UPDATE data_sync_logs SET status = ?, records_processed = ?, records_failed = ?, \
                 duration_ms = ?, error = ?, completed_at = ? WHERE id = ? AND status = 'started'",
                &[
                    Bind::Text(outcome.status.as_str()),
                    Bind::Int(outcome.records_processed as i64),
                    Bind::Int(outcome.records_failed as i64),
                    Bind::Int(outcome.duration.as_millis() as i64),
                    Bind::OptText(outcome.error.as_deref()),
                    Bind::Int(now_millis()),
                    Bind::Text(id),
                ],
            )
            .await?;
        Ok(affected > 0)
    }

    async fn get_sync_log(&self, id: &str) -> Result<Option<SyncLog>, SyncError> {
        let sql = format!("SELECT {} FROM data_sync_logs WHERE id = ?", SYNC_LOG_COLS);
        self.fetch_optional("get_sync_log", &sql, &[Bind::Text(id)])
            .await?
            .as_ref()
            .map(sync_log_from_row)
            .transpose()
    }

    async fn list_sync_logs(
        &self,
        season: Option<&SeasonId>,
        limit: usize,
    ) -> Result<Vec<SyncLog>, SyncError> {
        let limit = Bind::Int(limit.min(10_000) as i64);
        let rows = match season {
            Some(s) => {
                let sql = format!(
                    "SELECT {} FROM data_sync_logs WHERE season_id = ? ORDER BY started_at DESC LIMIT ?",
                    SYNC_LOG_COLS
                );
                self.fetch_all("list_sync_logs", &sql, &[Bind::Text(s.as_str()), limit]).await?
            }
            None => {
                let sql = format!(
                    "SELECT {} FROM data_sync_logs ORDER BY started_at DESC LIMIT ?",
                    SYNC_LOG_COLS
                );
                self.fetch_all("list_sync_logs", &sql, &[limit]).await?
            }
        };
        decode_all(rows, sync_log_from_row)
    }
}
