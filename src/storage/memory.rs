// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! In-process repository with the same conflict rules as [`SqlRepository`](super::SqlRepository).
//!
//! Used by tests and by deployments that run without a database. Lap time
//! batches are validated the way the SQL `CHECK` constraint validates them,
//! so partial-batch behavior matches.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;

use super::traits::{BulkWriteReport, Repository};
use crate::error::SyncError;
use crate::model::{
    calculate_completeness, now_millis, Circuit, Constructor, ConstructorStanding, Driver,
    DriverStanding, LapTime, QualifyingResult, Race, RaceResult, RaceStatus, Season, SeasonId,
    SyncLog, SyncOutcome, SyncStatus,
};

type StandingKey = (SeasonId, String, String);

#[derive(Default)]
pub struct MemoryRepository {
    seasons: DashMap<SeasonId, Season>,
    circuits: DashMap<String, Circuit>,
    constructors: DashMap<String, Constructor>,
    // Serialized so a code release and the insert that takes it over are atomic
    drivers: Mutex<Vec<Driver>>,
    races: DashMap<String, Race>,
    lap_times: DashMap<(String, u32, String), LapTime>,
    driver_standings: DashMap<StandingKey, DriverStanding>,
    constructor_standings: DashMap<StandingKey, ConstructorStanding>,
    sync_logs: DashMap<String, SyncLog>,
}

impl MemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored races across all seasons.
    #[must_use]
    pub fn race_count(&self) -> usize {
        self.races.len()
    }

    fn race_mut<R>(
        &self,
        season: &SeasonId,
        round: u32,
        f: impl FnOnce(&mut Race) -> R,
    ) -> Option<R> {
        let id = Race::make_id(season, round);
        self.races.get_mut(&id).map(|mut race| f(&mut race))
    }

    fn latest_race_id<V>(
        map: &DashMap<StandingKey, V>,
        season: &SeasonId,
    ) -> Option<String> {
        map.iter()
            .filter(|e| &e.key().0 == season)
            .map(|e| e.key().1.clone())
            .max()
    }
}

fn sort_standings<T>(rows: &mut [T], key: impl Fn(&T) -> (Option<u32>, f64)) {
    rows.sort_by(|a, b| {
        let (pa, xa) = key(a);
        let (pb, xb) = key(b);
        match (pa, pb) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => xb.total_cmp(&xa),
        }
    });
}

fn merge_opt<T: Clone>(incoming: &Option<T>, existing: &Option<T>) -> Option<T> {
    incoming.clone().or_else(|| existing.clone())
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn ping(&self) -> Result<(), SyncError> {
        Ok(())
    }

    async fn upsert_seasons(&self, seasons: &[Season]) -> Result<BulkWriteReport, SyncError> {
        for season in seasons {
            self.seasons
                .entry(season.id.clone())
                .and_modify(|s| {
                    s.name.clone_from(&season.name);
                    s.is_active = season.is_active;
                })
                .or_insert_with(|| season.clone());
        }
        Ok(BulkWriteReport::single(seasons.len()))
    }

    async fn get_season(&self, id: &SeasonId) -> Result<Option<Season>, SyncError> {
        Ok(self.seasons.get(id).map(|s| s.clone()))
    }

    async fn list_seasons(&self) -> Result<Vec<Season>, SyncError> {
        let mut all: Vec<Season> = self.seasons.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| b.year.cmp(&a.year));
        Ok(all)
    }

    async fn upsert_circuits(&self, circuits: &[Circuit]) -> Result<BulkWriteReport, SyncError> {
        for circuit in circuits {
            self.circuits.entry(circuit.id.clone()).or_insert_with(|| circuit.clone());
        }
        Ok(BulkWriteReport::single(circuits.len()))
    }

    async fn get_circuit(&self, id: &str) -> Result<Option<Circuit>, SyncError> {
        Ok(self.circuits.get(id).map(|c| c.clone()))
    }

    async fn upsert_constructors(
        &self,
        constructors: &[Constructor],
    ) -> Result<BulkWriteReport, SyncError> {
        for incoming in constructors {
            self.constructors
                .entry(incoming.id.clone())
                .and_modify(|c| {
                    c.name.clone_from(&incoming.name);
                    c.nationality = merge_opt(&incoming.nationality, &c.nationality);
                    c.url = merge_opt(&incoming.url, &c.url);
                    c.is_active |= incoming.is_active;
                })
                .or_insert_with(|| incoming.clone());
        }
        Ok(BulkWriteReport::single(constructors.len()))
    }

    async fn get_constructor(&self, id: &str) -> Result<Option<Constructor>, SyncError> {
        Ok(self.constructors.get(id).map(|c| c.clone()))
    }

    async fn list_constructors(&self, active_only: bool) -> Result<Vec<Constructor>, SyncError> {
        let mut all: Vec<Constructor> = self
            .constructors
            .iter()
            .filter(|e| !active_only || e.is_active)
            .map(|e| e.value().clone())
            .collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    async fn upsert_drivers(&self, drivers: &[Driver]) -> Result<BulkWriteReport, SyncError> {
        let mut stored = self.drivers.lock();
        for incoming in drivers {
            if let Some(code) = incoming.code.as_deref() {
                for other in stored.iter_mut().filter(|d| d.id != incoming.id) {
                    if other.code.as_deref() == Some(code) {
                        other.code = None;
                    }
                }
            }
            match stored.iter_mut().find(|d| d.id == incoming.id) {
                Some(d) => {
                    d.code = merge_opt(&incoming.code, &d.code);
                    d.permanent_number = incoming.permanent_number.or(d.permanent_number);
                    d.given_name.clone_from(&incoming.given_name);
                    d.family_name.clone_from(&incoming.family_name);
                    d.full_name.clone_from(&incoming.full_name);
                    d.date_of_birth = incoming.date_of_birth.or(d.date_of_birth);
                    d.nationality = merge_opt(&incoming.nationality, &d.nationality);
                    d.url = merge_opt(&incoming.url, &d.url);
                    d.is_active |= incoming.is_active;
                }
                None => stored.push(incoming.clone()),
            }
        }
        Ok(BulkWriteReport::single(drivers.len()))
    }

    async fn get_driver(&self, id: &str) -> Result<Option<Driver>, SyncError> {
        Ok(self.drivers.lock().iter().find(|d| d.id == id).cloned())
    }

    async fn list_drivers(&self, active_only: bool) -> Result<Vec<Driver>, SyncError> {
        let mut all: Vec<Driver> = self
            .drivers
            .lock()
            .iter()
            .filter(|d| !active_only || d.is_active)
            .cloned()
            .collect();
        all.sort_by(|a, b| (&a.family_name, &a.given_name).cmp(&(&b.family_name, &b.given_name)));
        Ok(all)
    }

    async fn upsert_races(&self, races: &[Race]) -> Result<BulkWriteReport, SyncError> {
        for incoming in races {
            self.races
                .entry(incoming.id.clone())
                .and_modify(|r| {
                    r.circuit_id.clone_from(&incoming.circuit_id);
                    r.name.clone_from(&incoming.name);
                    r.date = incoming.date;
                    r.time = merge_opt(&incoming.time, &r.time);
                    r.qualifying_date = incoming.qualifying_date.or(r.qualifying_date);
                    r.sprint_date = incoming.sprint_date.or(r.sprint_date);
                    r.status = r.status.merge(incoming.status);
                    r.url = merge_opt(&incoming.url, &r.url);
                    r.race_results = merge_opt(&incoming.race_results, &r.race_results);
                    r.qualifying_results =
                        merge_opt(&incoming.qualifying_results, &r.qualifying_results);
                })
                .or_insert_with(|| incoming.clone());
        }
        Ok(BulkWriteReport::single(races.len()))
    }

    async fn get_race(&self, season: &SeasonId, round: u32) -> Result<Option<Race>, SyncError> {
        Ok(self.races.get(&Race::make_id(season, round)).map(|r| r.clone()))
    }

    async fn list_races(&self, season: &SeasonId) -> Result<Vec<Race>, SyncError> {
        let mut all: Vec<Race> = self
            .races
            .iter()
            .filter(|e| &e.season_id == season)
            .map(|e| e.value().clone())
            .collect();
        all.sort_by_key(|r| r.round);
        Ok(all)
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
        Ok(self
            .race_mut(season, round, |race| {
                race.race_results = Some(results.to_vec());
                race.status = RaceStatus::Completed;
            })
            .is_some())
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
        Ok(self
            .race_mut(season, round, |race| race.qualifying_results = Some(results.to_vec()))
            .is_some())
    }

    async fn insert_lap_times(
        &self,
        laps: &[LapTime],
        batch_size: usize,
    ) -> Result<BulkWriteReport, SyncError> {
        let mut report = BulkWriteReport::default();
        let batch_size = batch_size.max(1);
        let total_batches = laps.len().div_ceil(batch_size);

        for (index, batch) in laps.chunks(batch_size).enumerate() {
            if let Some(bad) = batch.iter().find(|l| l.lap == 0) {
                crate::metrics::record_batch("lap_times", false);
                return Err(SyncError::Persistence(format!(
                    "lap_times: batch {} of {} failed after {} rows committed: lap must be positive (driver {})",
                    index + 1,
                    total_batches,
                    report.rows,
                    bad.driver_id
                )));
            }
            for lap in batch {
                self.lap_times
                    .insert((lap.race_id.clone(), lap.lap, lap.driver_id.clone()), lap.clone());
            }
            crate::metrics::record_batch("lap_times", true);
            report.rows += batch.len();
            report.batches += 1;
        }
        Ok(report)
    }

    async fn count_lap_times(&self, race_id: &str) -> Result<u64, SyncError> {
        Ok(self.lap_times.iter().filter(|e| e.key().0 == race_id).count() as u64)
    }

    async fn upsert_driver_standings(
        &self,
        rows: &[DriverStanding],
    ) -> Result<BulkWriteReport, SyncError> {
        for row in rows {
            let key = (row.season_id.clone(), row.race_id.clone(), row.driver_id.clone());
            self.driver_standings.insert(key, row.clone());
        }
        Ok(BulkWriteReport::single(rows.len()))
    }

    async fn upsert_constructor_standings(
        &self,
        rows: &[ConstructorStanding],
    ) -> Result<BulkWriteReport, SyncError> {
        for row in rows {
            let key = (row.season_id.clone(), row.race_id.clone(), row.constructor_id.clone());
            self.constructor_standings.insert(key, row.clone());
        }
        Ok(BulkWriteReport::single(rows.len()))
    }

    async fn list_driver_standings(
        &self,
        season: &SeasonId,
        race_id: Option<&str>,
    ) -> Result<Vec<DriverStanding>, SyncError> {
        let Some(race) = race_id
            .map(str::to_string)
            .or_else(|| Self::latest_race_id(&self.driver_standings, season))
        else {
            return Ok(Vec::new());
        };
        let mut rows: Vec<DriverStanding> = self
            .driver_standings
            .iter()
            .filter(|e| &e.key().0 == season && e.key().1 == race)
            .map(|e| e.value().clone())
            .collect();
        sort_standings(&mut rows, |s| (s.position, s.points));
        Ok(rows)
    }

    async fn list_constructor_standings(
        &self,
        season: &SeasonId,
        race_id: Option<&str>,
    ) -> Result<Vec<ConstructorStanding>, SyncError> {
        let Some(race) = race_id
            .map(str::to_string)
            .or_else(|| Self::latest_race_id(&self.constructor_standings, season))
        else {
            return Ok(Vec::new());
        };
        let mut rows: Vec<ConstructorStanding> = self
            .constructor_standings
            .iter()
            .filter(|e| &e.key().0 == season && e.key().1 == race)
            .map(|e| e.value().clone())
            .collect();
        sort_standings(&mut rows, |s| (s.position, s.points));
        Ok(rows)
    }

    async fn recompute_completeness(&self, season: &SeasonId) -> Result<f64, SyncError> {
        let (mut total, mut completed) = (0u64, 0u64);
        for race in self.races.iter().filter(|r| &r.season_id == season) {
            match race.status {
                RaceStatus::Cancelled => {}
                RaceStatus::Completed => {
                    total += 1;
                    completed += 1;
                }
                RaceStatus::Scheduled => total += 1,
            }
        }
        let completeness = calculate_completeness(completed, total);
        if let Some(mut s) = self.seasons.get_mut(season) {
            s.completeness = completeness;
        }
        Ok(completeness)
    }

    async fn start_sync_log(&self, log: &SyncLog) -> Result<(), SyncError> {
        if self.sync_logs.contains_key(&log.id) {
            return Err(SyncError::Persistence(format!("sync log {} already exists", log.id)));
        }
        self.sync_logs.insert(log.id.clone(), log.clone());
        Ok(())
    }

    async fn finish_sync_log(&self, id: &str, outcome: &SyncOutcome) -> Result<bool, SyncError> {
        if outcome.status == SyncStatus::Started {
            return Err(SyncError::validation(
                "a sync log can only finish as completed or failed",
                "started",
            ));
        }
        let Some(mut log) = self.sync_logs.get_mut(id) else {
            return Ok(false);
        };
        if log.status != SyncStatus::Started {
            return Ok(false);
        }
        log.status = outcome.status;
        log.records_processed = outcome.records_processed;
        log.records_failed = outcome.records_failed;
        log.duration_ms = Some(outcome.duration.as_millis() as u64);
        log.error.clone_from(&outcome.error);
        log.completed_at = Some(now_millis());
        Ok(true)
    }

    async fn get_sync_log(&self, id: &str) -> Result<Option<SyncLog>, SyncError> {
        Ok(self.sync_logs.get(id).map(|l| l.clone()))
    }

    async fn list_sync_logs(
        &self,
        season: Option<&SeasonId>,
        limit: usize,
    ) -> Result<Vec<SyncLog>, SyncError> {
        let mut logs: Vec<SyncLog> = self
            .sync_logs
            .iter()
            .filter(|e| season.map_or(true, |s| e.season_id.as_ref() == Some(s)))
            .map(|e| e.value().clone())
            .collect();
        logs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        logs.truncate(limit);
        Ok(logs)
    }
}
