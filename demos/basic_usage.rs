// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Basic pitwall-sync usage.
//!
//! Demonstrates:
//! 1. Building the service from `PITWALL_*` environment variables
//! 2. Syncing one season from the live racing API
//! 3. Reading races and standings back through the cache
//! 4. Health reporting and clean shutdown
//!
//! # Run
//!
//! ```bash
//! # SQLite file in the working directory, in-process cache
//! PITWALL_SQL_URL="sqlite://pitwall-demo.db?mode=rwc" cargo run --example basic_usage -- 2023
//!
//! # With Redis
//! PITWALL_REDIS_URL=redis://localhost:6379 PITWALL_SQL_URL=... cargo run --example basic_usage
//! ```

use pitwall_sync::api::{respond, ApiEnvelope};
use pitwall_sync::{F1DataService, PitwallConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_target(false).compact().init();

    let season = std::env::args().nth(1).unwrap_or_else(|| "2023".to_string());

    let mut config = PitwallConfig::from_env()?;
    if config.sql_url.is_none() {
        config.sql_url = Some("sqlite://pitwall-demo.db?mode=rwc".into());
    }

    println!("Connecting (redis: {})...", config.redis_url.is_some());
    let service = F1DataService::init(config).await?;
    println!("   Cache backend: {}", service.cache().backend());

    // ─────────────────────────────────────────────────────────────────────────
    // Full season sync
    // ─────────────────────────────────────────────────────────────────────────
    println!("\nSyncing season {}...", season);
    let report = service.sync_season(&season).await?;
    println!(
        "   {}: {}/{} races, {} records, completeness {:.0}% in {:?}",
        report.status.as_str(),
        report.races_synced,
        report.races_total,
        report.records_processed,
        report.completeness * 100.0,
        report.duration,
    );
    if !report.failed_rounds.is_empty() {
        println!("   Failed rounds: {:?}", report.failed_rounds);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reads: second call is a cache hit
    // ─────────────────────────────────────────────────────────────────────────
    let races = service.races(&season).await?;
    let _ = service.races(&season).await?;
    println!("\n{} races, first: {}", races.len(), races.first().map_or("-", |r| r.name.as_str()));

    let standings = service.standings(&season, "driver").await?;
    println!("Driver standings as of round {}: {} rows", standings.round(), standings.len());

    let (status, envelope): (u16, ApiEnvelope<_>) = respond(service.race(&season, 99).await);
    println!("\nGET /races/{}/99 -> {} {}", season, status, serde_json::to_string(&envelope)?);

    // ─────────────────────────────────────────────────────────────────────────
    // Health
    // ─────────────────────────────────────────────────────────────────────────
    let health = service.health().await;
    let stats = &health.cache_stats;
    println!(
        "\nHealthy: {} (cache hits {}, misses {}, stale {})",
        health.is_healthy(),
        stats.hits,
        stats.misses,
        stats.stale_serves,
    );

    service.close().await;
    println!("Closed.");
    Ok(())
}
