// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for pitwall-sync.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The embedding service is responsible for choosing the exporter.
//!
//! # Metric Naming Convention
//! - `pitwall_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `api`: racing_api, telemetry_api
//! - `backend`: memory, redis, sql
//! - `outcome`: success, error, rejected, stale

use metrics::{counter, gauge, histogram};
use std::time::{Duration, Instant};

// ═══════════════════════════════════════════════════════════════════════════
// UPSTREAM SOURCES
// ═══════════════════════════════════════════════════════════════════════════

/// Record one upstream HTTP request
pub fn record_source_request(api: &str, endpoint: &str, outcome: &str) {
    counter!(
        "pitwall_source_requests_total",
        "api" => api.to_string(),
        "endpoint" => endpoint.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record upstream request latency
pub fn record_source_latency(api: &str, endpoint: &str, duration: Duration) {
    histogram!(
        "pitwall_source_request_seconds",
        "api" => api.to_string(),
        "endpoint" => endpoint.to_string()
    )
    .record(duration.as_secs_f64());
}

// ═══════════════════════════════════════════════════════════════════════════
// RESILIENCE
// ═══════════════════════════════════════════════════════════════════════════

/// Record a retry attempt for an operation
pub fn record_retry(operation: &str) {
    counter!(
        "pitwall_retries_total",
        "operation" => operation.to_string()
    )
    .increment(1);
}

/// Record circuit breaker state change (0 = closed, 1 = half-open, 2 = open)
pub fn set_circuit_state(circuit: &str, state: u8) {
    gauge!(
        "pitwall_circuit_breaker_state",
        "circuit" => circuit.to_string()
    )
    .set(state as f64);
}

/// Record circuit breaker call
pub fn record_circuit_call(circuit: &str, outcome: &str) {
    counter!(
        "pitwall_circuit_breaker_calls_total",
        "circuit" => circuit.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

// ═══════════════════════════════════════════════════════════════════════════
// CACHE
// ═══════════════════════════════════════════════════════════════════════════

/// Record a cache lookup (`hit`, `miss`, `stale`)
pub fn record_cache_lookup(backend: &str, outcome: &str) {
    counter!(
        "pitwall_cache_lookups_total",
        "backend" => backend.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record a cache backend error that was downgraded to a miss
pub fn record_cache_error(backend: &str, operation: &str) {
    counter!(
        "pitwall_cache_errors_total",
        "backend" => backend.to_string(),
        "operation" => operation.to_string()
    )
    .increment(1);
}

/// Record keys removed by pattern invalidation or expiry sweeps
pub fn record_cache_evictions(reason: &str, count: usize) {
    counter!(
        "pitwall_cache_evictions_total",
        "reason" => reason.to_string()
    )
    .increment(count as u64);
}

/// Set current in-memory cache entry count
pub fn set_cache_entries(count: usize) {
    gauge!("pitwall_cache_entries").set(count as f64);
}

// ═══════════════════════════════════════════════════════════════════════════
// REPOSITORY
// ═══════════════════════════════════════════════════════════════════════════

/// Record rows written to a table
pub fn record_rows_written(table: &str, count: usize) {
    counter!(
        "pitwall_rows_written_total",
        "table" => table.to_string()
    )
    .increment(count as u64);
}

/// Record one bulk-write batch outcome
pub fn record_batch(table: &str, success: bool) {
    let status = if success { "success" } else { "error" };
    counter!(
        "pitwall_batches_total",
        "table" => table.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record query latency
pub fn record_query_latency(operation: &str, duration: Duration) {
    histogram!(
        "pitwall_query_seconds",
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Set backend health (1 = healthy, 0 = unhealthy)
pub fn set_backend_healthy(backend: &str, healthy: bool) {
    gauge!(
        "pitwall_backend_healthy",
        "backend" => backend.to_string()
    )
    .set(if healthy { 1.0 } else { 0.0 });
}

// ═══════════════════════════════════════════════════════════════════════════
// SYNC RUNS
// ═══════════════════════════════════════════════════════════════════════════

/// Record a finished sync run
pub fn record_sync_run(sync_type: &str, status: &str, duration: Duration) {
    counter!(
        "pitwall_sync_runs_total",
        "type" => sync_type.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "pitwall_sync_run_seconds",
        "type" => sync_type.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Record per-race sync outcome within a season run
pub fn record_race_sync(success: bool) {
    let status = if success { "success" } else { "error" };
    counter!(
        "pitwall_race_syncs_total",
        "status" => status.to_string()
    )
    .increment(1);
}

/// Set number of race syncs currently in flight
pub fn set_races_in_flight(count: usize) {
    gauge!("pitwall_races_in_flight").set(count as f64);
}

/// Set orchestrator phase as a labelled counter
pub fn set_sync_phase(phase: &str) {
    counter!(
        "pitwall_sync_phase_transitions_total",
        "phase" => phase.to_string()
    )
    .increment(1);
}

/// A timing guard that records query latency on drop
pub struct LatencyTimer {
    operation: &'static str,
    start: Instant,
}

impl LatencyTimer {
    /// Start a new latency timer
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            start: Instant::now(),
        }
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        record_query_latency(self.operation, self.start.elapsed());
    }
}
