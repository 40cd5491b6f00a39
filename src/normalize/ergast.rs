// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Racing API payloads → canonical entities.
//!
//! One function per endpoint shape. Entities referenced inside a payload
//! (the circuit of a race, the driver and constructor of a result) are
//! returned alongside so callers can create them lazily before writing the
//! rows that reference them.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

use super::upstream::{
    ConstructorTableBody, DriverTableBody, Envelope, RaceTableBody, SeasonTableBody,
    StandingsTableBody, WireCircuit, WireConstructor, WireDriver, WireRace,
};
use super::{
    non_empty, optional_date, optional_f64, optional_u32, optional_u64, parse_lap_time_millis,
    required_date, required_u32, shape_error,
};
use crate::error::SyncError;
use crate::model::{
    Circuit, Constructor, ConstructorStanding, Driver, DriverStanding, FastestLap, LapTime,
    QualifyingResult, Race, RaceResult, RaceStatus, Season, SeasonId, StandingsKind,
    StandingsSnapshot,
};

/// Pagination header of an `MRData` envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    pub limit: u64,
    pub offset: u64,
    pub total: u64,
}

impl PageInfo {
    /// Offset of the next page, or `None` when this page reaches `total`.
    #[must_use]
    pub fn next_offset(&self) -> Option<u64> {
        let next = self.offset.saturating_add(self.limit);
        (self.limit > 0 && next < self.total).then_some(next)
    }
}

/// A race calendar plus the circuits it references.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schedule {
    pub races: Vec<Race>,
    pub circuits: Vec<Circuit>,
}

/// Race classification plus the entrants it references.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub results: Vec<RaceResult>,
    pub drivers: Vec<Driver>,
    pub constructors: Vec<Constructor>,
}

impl ResultSet {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QualifyingSet {
    pub results: Vec<QualifyingResult>,
    pub drivers: Vec<Driver>,
    pub constructors: Vec<Constructor>,
}

fn envelope<'a, T: Deserialize<'a>>(
    endpoint: &str,
    raw: &'a Value,
) -> Result<Envelope<T>, SyncError> {
    Envelope::<T>::deserialize(raw).map_err(|e| shape_error(endpoint, e))
}

pub fn page_info(raw: &Value) -> Result<PageInfo, SyncError> {
    let mr = raw
        .get("MRData")
        .ok_or_else(|| shape_error("envelope", "missing MRData"))?;
    let field = |name: &str| -> Result<u64, SyncError> {
        match mr.get(name) {
            Some(Value::String(s)) => s
                .trim()
                .parse()
                .map_err(|_| shape_error("envelope", format!("{} is not a number: '{}'", name, s))),
            Some(Value::Number(n)) => n
                .as_u64()
                .ok_or_else(|| shape_error("envelope", format!("{} is negative", name))),
            Some(_) => Err(shape_error("envelope", format!("{} has the wrong type", name))),
            None => Ok(0),
        }
    };
    Ok(PageInfo {
        limit: field("limit")?,
        offset: field("offset")?,
        total: field("total")?,
    })
}

/// `/seasons.json`. Only `current_year` is flagged active.
pub fn seasons(raw: &Value, current_year: i32) -> Result<Vec<Season>, SyncError> {
    let env: Envelope<SeasonTableBody> = envelope("seasons", raw)?;
    env.mr_data
        .body
        .table
        .seasons
        .iter()
        .map(|s| {
            let id = SeasonId::parse(&s.season).map_err(|e| shape_error("seasons", e))?;
            let active = id.year() == current_year;
            Ok::<_, SyncError>(Season::new(id, active))
        })
        .collect()
}

/// `/{season}.json`. Status is `completed` only when the payload embeds results.
pub fn schedule(raw: &Value) -> Result<Schedule, SyncError> {
    let env: Envelope<RaceTableBody> = envelope("races", raw)?;
    let mut circuits: BTreeMap<String, Circuit> = BTreeMap::new();
    let mut races = Vec::with_capacity(env.mr_data.body.table.races.len());

    for wire in &env.mr_data.body.table.races {
        let race = race_from_wire("races", wire)?;
        circuits
            .entry(wire.circuit.circuit_id.clone())
            .or_insert_with(|| circuit_from_wire(&wire.circuit));
        races.push(race);
    }

    Ok(Schedule {
        races,
        circuits: circuits.into_values().collect(),
    })
}

fn race_from_wire(endpoint: &str, wire: &WireRace) -> Result<Race, SyncError> {
    let season = SeasonId::parse(&wire.season).map_err(|e| shape_error(endpoint, e))?;
    let round = required_u32(endpoint, "round", &wire.round)?;
    if round == 0 {
        return Err(shape_error(endpoint, "round must be positive"));
    }
    let date = required_date(endpoint, "date", &wire.date)?;

    let race_results = match &wire.results {
        Some(rows) if !rows.is_empty() => Some(
            rows.iter()
                .map(|r| result_from_wire(endpoint, r))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        _ => None,
    };
    let status = if race_results.is_some() {
        RaceStatus::Completed
    } else {
        RaceStatus::Scheduled
    };

    Ok(Race {
        id: Race::make_id(&season, round),
        season_id: season,
        circuit_id: wire.circuit.circuit_id.clone(),
        round,
        name: wire.race_name.clone(),
        date,
        time: non_empty(wire.time.as_ref()),
        qualifying_date: wire.qualifying.as_ref().and_then(|s| optional_date(Some(&s.date))),
        sprint_date: wire.sprint.as_ref().and_then(|s| optional_date(Some(&s.date))),
        status,
        url: non_empty(wire.url.as_ref()),
        race_results,
        qualifying_results: None,
    })
}

fn circuit_from_wire(wire: &WireCircuit) -> Circuit {
    let loc = wire.location.as_ref();
    Circuit {
        id: wire.circuit_id.clone(),
        name: wire.circuit_name.clone(),
        locality: loc.and_then(|l| non_empty(l.locality.as_ref())).unwrap_or_default(),
        country: loc.and_then(|l| non_empty(l.country.as_ref())).unwrap_or_default(),
        latitude: loc.and_then(|l| optional_f64(l.lat.as_ref())),
        longitude: loc.and_then(|l| optional_f64(l.long.as_ref())),
        url: non_empty(wire.url.as_ref()),
    }
}

fn driver_from_wire(wire: &WireDriver, is_active: bool) -> Driver {
    Driver {
        id: wire.driver_id.clone(),
        code: non_empty(wire.code.as_ref()).map(|c| c.to_ascii_uppercase()),
        permanent_number: optional_u32(wire.permanent_number.as_ref()),
        given_name: wire.given_name.trim().to_string(),
        family_name: wire.family_name.trim().to_string(),
        full_name: Driver::compose_full_name(&wire.given_name, &wire.family_name),
        date_of_birth: optional_date(wire.date_of_birth.as_ref()),
        nationality: non_empty(wire.nationality.as_ref()),
        url: non_empty(wire.url.as_ref()),
        is_active,
    }
}

fn constructor_from_wire(wire: &WireConstructor, is_active: bool) -> Constructor {
    Constructor {
        id: wire.constructor_id.clone(),
        name: wire.name.clone(),
        nationality: non_empty(wire.nationality.as_ref()),
        url: non_empty(wire.url.as_ref()),
        is_active,
    }
}

fn result_from_wire(
    endpoint: &str,
    wire: &super::upstream::WireResult,
) -> Result<RaceResult, SyncError> {
    let position = optional_u32(wire.position.as_ref());
    let position_text = non_empty(wire.position_text.as_ref())
        .or_else(|| position.map(|p| p.to_string()))
        .ok_or_else(|| shape_error(endpoint, "result has neither position nor positionText"))?;

    let fastest_lap = wire.fastest_lap.as_ref().map(|f| FastestLap {
        rank: optional_u32(f.rank.as_ref()),
        lap: optional_u32(f.lap.as_ref()),
        time: f.time.as_ref().and_then(|t| non_empty(t.time.as_ref())),
        average_speed_kph: f
            .average_speed
            .as_ref()
            .filter(|s| s.units.as_deref().map_or(true, |u| u == "kph"))
            .and_then(|s| optional_f64(s.speed.as_ref())),
    });

    Ok(RaceResult {
        driver_id: wire.driver.driver_id.clone(),
        constructor_id: wire.constructor.constructor_id.clone(),
        number: optional_u32(wire.number.as_ref()),
        position,
        position_text,
        points: optional_f64(wire.points.as_ref()).unwrap_or(0.0),
        grid: optional_u32(wire.grid.as_ref()),
        laps: optional_u32(wire.laps.as_ref()),
        status: non_empty(wire.status.as_ref()).unwrap_or_default(),
        time_millis: wire.time.as_ref().and_then(|t| optional_u64(t.millis.as_ref())),
        time_text: wire.time.as_ref().and_then(|t| non_empty(t.time.as_ref())),
        fastest_lap,
    })
}

fn single_race<'a>(
    endpoint: &str,
    races: &'a [WireRace],
) -> Result<Option<&'a WireRace>, SyncError> {
    match races {
        [] => Ok(None),
        [race] => Ok(Some(race)),
        _ => Err(shape_error(endpoint, format!("expected one race, got {}", races.len()))),
    }
}

/// `/{season}/{round}/results.json`. An empty race table (race not yet run)
/// yields an empty set.
pub fn race_results(raw: &Value) -> Result<ResultSet, SyncError> {
    let env: Envelope<RaceTableBody> = envelope("results", raw)?;
    let Some(race) = single_race("results", &env.mr_data.body.table.races)? else {
        return Ok(ResultSet::default());
    };
    let Some(rows) = &race.results else {
        return Ok(ResultSet::default());
    };

    let mut drivers = BTreeMap::new();
    let mut constructors = BTreeMap::new();
    let mut results = Vec::with_capacity(rows.len());
    for row in rows {
        results.push(result_from_wire("results", row)?);
        drivers
            .entry(row.driver.driver_id.clone())
            .or_insert_with(|| driver_from_wire(&row.driver, false));
        constructors
            .entry(row.constructor.constructor_id.clone())
            .or_insert_with(|| constructor_from_wire(&row.constructor, false));
    }

    Ok(ResultSet {
        results,
        drivers: drivers.into_values().collect(),
        constructors: constructors.into_values().collect(),
    })
}

/// `/{season}/{round}/qualifying.json`
pub fn qualifying(raw: &Value) -> Result<QualifyingSet, SyncError> {
    let env: Envelope<RaceTableBody> = envelope("qualifying", raw)?;
    let Some(race) = single_race("qualifying", &env.mr_data.body.table.races)? else {
        return Ok(QualifyingSet::default());
    };
    let Some(rows) = &race.qualifying_results else {
        return Ok(QualifyingSet::default());
    };

    let mut drivers = BTreeMap::new();
    let mut constructors = BTreeMap::new();
    let results = rows
        .iter()
        .map(|row| {
            drivers
                .entry(row.driver.driver_id.clone())
                .or_insert_with(|| driver_from_wire(&row.driver, false));
            constructors
                .entry(row.constructor.constructor_id.clone())
                .or_insert_with(|| constructor_from_wire(&row.constructor, false));
            QualifyingResult {
                driver_id: row.driver.driver_id.clone(),
                constructor_id: row.constructor.constructor_id.clone(),
                number: optional_u32(row.number.as_ref()),
                position: optional_u32(row.position.as_ref()),
                q1: non_empty(row.q1.as_ref()),
                q2: non_empty(row.q2.as_ref()),
                q3: non_empty(row.q3.as_ref()),
            }
        })
        .collect();

    Ok(QualifyingSet {
        results,
        drivers: drivers.into_values().collect(),
        constructors: constructors.into_values().collect(),
    })
}

/// One page of `/{season}/{round}/laps.json`.
pub fn lap_times(raw: &Value) -> Result<Vec<LapTime>, SyncError> {
    let env: Envelope<RaceTableBody> = envelope("laps", raw)?;
    let Some(race) = single_race("laps", &env.mr_data.body.table.races)? else {
        return Ok(Vec::new());
    };
    let season = SeasonId::parse(&race.season).map_err(|e| shape_error("laps", e))?;
    let round = required_u32("laps", "round", &race.round)?;
    let race_id = Race::make_id(&season, round);

    let mut out = Vec::new();
    for lap in race.laps.iter().flatten() {
        let number = required_u32("laps", "lap number", &lap.number)?;
        for timing in &lap.timings {
            out.push(LapTime {
                race_id: race_id.clone(),
                lap: number,
                driver_id: timing.driver_id.clone(),
                position: optional_u32(timing.position.as_ref()),
                time_text: timing.time.trim().to_string(),
                millis: parse_lap_time_millis(&timing.time),
            });
        }
    }
    Ok(out)
}

/// `/{season}/drivers.json`
pub fn drivers(raw: &Value, is_active: bool) -> Result<Vec<Driver>, SyncError> {
    let env: Envelope<DriverTableBody> = envelope("drivers", raw)?;
    Ok(env
        .mr_data
        .body
        .table
        .drivers
        .iter()
        .map(|d| driver_from_wire(d, is_active))
        .collect())
}

/// `/{season}/constructors.json`
pub fn constructors(raw: &Value, is_active: bool) -> Result<Vec<Constructor>, SyncError> {
    let env: Envelope<ConstructorTableBody> = envelope("constructors", raw)?;
    Ok(env
        .mr_data
        .body
        .table
        .constructors
        .iter()
        .map(|c| constructor_from_wire(c, is_active))
        .collect())
}

/// `/{season}/driverStandings.json` or `/{season}/constructorStandings.json`.
///
/// Podiums, fastest laps and DNFs are not reported upstream and are written
/// as zero. Returns `None` when the season has no standings yet.
pub fn standings(
    raw: &Value,
    season: &SeasonId,
    kind: StandingsKind,
) -> Result<Option<StandingsSnapshot>, SyncError> {
    let endpoint = kind.endpoint();
    let env: Envelope<StandingsTableBody> = envelope(endpoint, raw)?;
    let Some(list) = env.mr_data.body.table.lists.last() else {
        return Ok(None);
    };
    let round = required_u32(endpoint, "round", &list.round)?;
    let race_id = Race::make_id(season, round);

    let snapshot = match kind {
        StandingsKind::Driver => {
            let rows = list
                .driver_standings
                .as_ref()
                .ok_or_else(|| shape_error(endpoint, "missing DriverStandings"))?
                .iter()
                .map(|row| {
                    let points = optional_f64(Some(&row.points)).ok_or_else(|| {
                        shape_error(endpoint, format!("points is not a number: '{}'", row.points))
                    })?;
                    let position = optional_u32(row.position.as_ref());
                    Ok::<_, SyncError>(DriverStanding {
                        season_id: season.clone(),
                        race_id: race_id.clone(),
                        driver_id: row.driver.driver_id.clone(),
                        constructor_id: row.constructors.last().map(|c| c.constructor_id.clone()),
                        position,
                        position_text: position_text(row.position_text.as_ref(), position),
                        points,
                        wins: optional_u32(row.wins.as_ref()).unwrap_or(0),
                        podiums: 0,
                        fastest_laps: 0,
                        dnfs: 0,
                    })
                })
                .collect::<Result<Vec<_>, SyncError>>()?;
            StandingsSnapshot::Driver { round, rows }
        }
        StandingsKind::Constructor => {
            let rows = list
                .constructor_standings
                .as_ref()
                .ok_or_else(|| shape_error(endpoint, "missing ConstructorStandings"))?
                .iter()
                .map(|row| {
                    let points = optional_f64(Some(&row.points)).ok_or_else(|| {
                        shape_error(endpoint, format!("points is not a number: '{}'", row.points))
                    })?;
                    let position = optional_u32(row.position.as_ref());
                    Ok::<_, SyncError>(ConstructorStanding {
                        season_id: season.clone(),
                        race_id: race_id.clone(),
                        constructor_id: row.constructor.constructor_id.clone(),
                        position,
                        position_text: position_text(row.position_text.as_ref(), position),
                        points,
                        wins: optional_u32(row.wins.as_ref()).unwrap_or(0),
                        podiums: 0,
                        fastest_laps: 0,
                        dnfs: 0,
                    })
                })
                .collect::<Result<Vec<_>, SyncError>>()?;
            StandingsSnapshot::Constructor { round, rows }
        }
    };
    Ok(Some(snapshot))
}

fn position_text(raw: Option<&String>, position: Option<u32>) -> String {
    non_empty(raw)
        .or_else(|| position.map(|p| p.to_string()))
        .unwrap_or_else(|| "-".to_string())
}
