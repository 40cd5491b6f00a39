// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Table definitions for SQLite and MySQL.
//!
//! Result payloads are JSON held in TEXT/LONGTEXT (sqlx's `Any` driver has no
//! JSON type mapping). Booleans are integers 0/1 and timestamps are epoch
//! milliseconds.

pub(crate) const SQLITE: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS seasons (
        id TEXT PRIMARY KEY,
        year INTEGER NOT NULL,
        name TEXT NOT NULL,
        completeness REAL NOT NULL DEFAULT 0,
        is_active INTEGER NOT NULL DEFAULT 0,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS circuits (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        locality TEXT NOT NULL,
        country TEXT NOT NULL,
        latitude REAL,
        longitude REAL,
        url TEXT,
        created_at INTEGER NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS constructors (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        nationality TEXT,
        url TEXT,
        is_active INTEGER NOT NULL DEFAULT 0,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS drivers (
        id TEXT PRIMARY KEY,
        code TEXT UNIQUE,
        permanent_number INTEGER,
        given_name TEXT NOT NULL,
        family_name TEXT NOT NULL,
        full_name TEXT NOT NULL,
        date_of_birth TEXT,
        nationality TEXT,
        url TEXT,
        is_active INTEGER NOT NULL DEFAULT 0,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS races (
        id TEXT PRIMARY KEY,
        season_id TEXT NOT NULL REFERENCES seasons(id),
        circuit_id TEXT NOT NULL REFERENCES circuits(id),
        round INTEGER NOT NULL,
        name TEXT NOT NULL,
        date TEXT NOT NULL,
        time TEXT,
        qualifying_date TEXT,
        sprint_date TEXT,
        status TEXT NOT NULL,
        url TEXT,
        race_results TEXT,
        qualifying_results TEXT,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        UNIQUE (season_id, round)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS lap_times (
        race_id TEXT NOT NULL,
        lap INTEGER NOT NULL CHECK (lap > 0),
        driver_id TEXT NOT NULL,
        position INTEGER,
        time_text TEXT NOT NULL,
        millis INTEGER,
        PRIMARY KEY (race_id, lap, driver_id)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS driver_standings (
        season_id TEXT NOT NULL,
        race_id TEXT NOT NULL,
        driver_id TEXT NOT NULL,
        constructor_id TEXT,
        position INTEGER,
        position_text TEXT NOT NULL,
        points REAL NOT NULL,
        wins INTEGER NOT NULL DEFAULT 0,
        podiums INTEGER NOT NULL DEFAULT 0,
        fastest_laps INTEGER NOT NULL DEFAULT 0,
        dnfs INTEGER NOT NULL DEFAULT 0,
        updated_at INTEGER NOT NULL,
        PRIMARY KEY (season_id, race_id, driver_id)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS constructor_standings (
        season_id TEXT NOT NULL,
        race_id TEXT NOT NULL,
        constructor_id TEXT NOT NULL,
        position INTEGER,
        position_text TEXT NOT NULL,
        points REAL NOT NULL,
        wins INTEGER NOT NULL DEFAULT 0,
        podiums INTEGER NOT NULL DEFAULT 0,
        fastest_laps INTEGER NOT NULL DEFAULT 0,
        dnfs INTEGER NOT NULL DEFAULT 0,
        updated_at INTEGER NOT NULL,
        PRIMARY KEY (season_id, race_id, constructor_id)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS data_sync_logs (
        id TEXT PRIMARY KEY,
        sync_type TEXT NOT NULL,
        season_id TEXT,
        round INTEGER,
        status TEXT NOT NULL,
        records_processed INTEGER NOT NULL DEFAULT 0,
        records_failed INTEGER NOT NULL DEFAULT 0,
        duration_ms INTEGER,
        error TEXT,
        started_at INTEGER NOT NULL,
        completed_at INTEGER
    )"#,
    "CREATE INDEX IF NOT EXISTS idx_races_season ON races (season_id, round)",
    "CREATE INDEX IF NOT EXISTS idx_sync_logs_season ON data_sync_logs (season_id, started_at)",
];

pub(crate) const MYSQL: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS seasons (
        id VARCHAR(4) PRIMARY KEY,
        year BIGINT NOT NULL,
        name VARCHAR(255) NOT NULL,
        completeness DOUBLE NOT NULL DEFAULT 0,
        is_active BIGINT NOT NULL DEFAULT 0,
        created_at BIGINT NOT NULL,
        updated_at BIGINT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS circuits (
        id VARCHAR(64) PRIMARY KEY,
        name VARCHAR(255) NOT NULL,
        locality VARCHAR(255) NOT NULL,
        country VARCHAR(255) NOT NULL,
        latitude DOUBLE,
        longitude DOUBLE,
        url VARCHAR(512),
        created_at BIGINT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS constructors (
        id VARCHAR(64) PRIMARY KEY,
        name VARCHAR(255) NOT NULL,
        nationality VARCHAR(64),
        url VARCHAR(512),
        is_active BIGINT NOT NULL DEFAULT 0,
        created_at BIGINT NOT NULL,
        updated_at BIGINT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS drivers (
        id VARCHAR(64) PRIMARY KEY,
        code VARCHAR(3) UNIQUE,
        permanent_number BIGINT,
        given_name VARCHAR(255) NOT NULL,
        family_name VARCHAR(255) NOT NULL,
        full_name VARCHAR(512) NOT NULL,
        date_of_birth VARCHAR(10),
        nationality VARCHAR(64),
        url VARCHAR(512),
        is_active BIGINT NOT NULL DEFAULT 0,
        created_at BIGINT NOT NULL,
        updated_at BIGINT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS races (
        id VARCHAR(16) PRIMARY KEY,
        season_id VARCHAR(4) NOT NULL,
        circuit_id VARCHAR(64) NOT NULL,
        round BIGINT NOT NULL,
        name VARCHAR(255) NOT NULL,
        date VARCHAR(10) NOT NULL,
        time VARCHAR(16),
        qualifying_date VARCHAR(10),
        sprint_date VARCHAR(10),
        status VARCHAR(16) NOT NULL,
        url VARCHAR(512),
        race_results LONGTEXT,
        qualifying_results LONGTEXT,
        created_at BIGINT NOT NULL,
        updated_at BIGINT NOT NULL,
        UNIQUE KEY uq_race_round (season_id, round),
        FOREIGN KEY (season_id) REFERENCES seasons(id),
        FOREIGN KEY (circuit_id) REFERENCES circuits(id)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS lap_times (
        race_id VARCHAR(16) NOT NULL,
        lap BIGINT NOT NULL,
        driver_id VARCHAR(64) NOT NULL,
        position BIGINT,
        time_text VARCHAR(32) NOT NULL,
        millis BIGINT,
        PRIMARY KEY (race_id, lap, driver_id),
        CONSTRAINT chk_lap_positive CHECK (lap > 0)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS driver_standings (
        season_id VARCHAR(4) NOT NULL,
        race_id VARCHAR(16) NOT NULL,
        driver_id VARCHAR(64) NOT NULL,
        constructor_id VARCHAR(64),
        position BIGINT,
        position_text VARCHAR(8) NOT NULL,
        points DOUBLE NOT NULL,
        wins BIGINT NOT NULL DEFAULT 0,
        podiums BIGINT NOT NULL DEFAULT 0,
        fastest_laps BIGINT NOT NULL DEFAULT 0,
        dnfs BIGINT NOT NULL DEFAULT 0,
        updated_at BIGINT NOT NULL,
        PRIMARY KEY (season_id, race_id, driver_id)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS constructor_standings (
        season_id VARCHAR(4) NOT NULL,
        race_id VARCHAR(16) NOT NULL,
        constructor_id VARCHAR(64) NOT NULL,
        position BIGINT,
        position_text VARCHAR(8) NOT NULL,
        points DOUBLE NOT NULL,
        wins BIGINT NOT NULL DEFAULT 0,
        podiums BIGINT NOT NULL DEFAULT 0,
        fastest_laps BIGINT NOT NULL DEFAULT 0,
        dnfs BIGINT NOT NULL DEFAULT 0,
        updated_at BIGINT NOT NULL,
        PRIMARY KEY (season_id, race_id, constructor_id)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS data_sync_logs (
        id VARCHAR(36) PRIMARY KEY,
        sync_type VARCHAR(32) NOT NULL,
        season_id VARCHAR(4),
        round BIGINT,
        status VARCHAR(16) NOT NULL,
        records_processed BIGINT NOT NULL DEFAULT 0,
        records_failed BIGINT NOT NULL DEFAULT 0,
        duration_ms BIGINT,
        error TEXT,
        started_at BIGINT NOT NULL,
        completed_at BIGINT,
        INDEX idx_sync_logs_season (season_id, started_at)
    )"#,
];
