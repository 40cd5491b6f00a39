// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Consecutive-failure circuit breaker.
//!
//! Protects the upstream APIs from being hammered while they are unhealthy.
//!
//! States:
//! - Closed: Normal operation, requests pass through
//! - Open: `failure_threshold` consecutive failures seen, requests fail fast
//! - HalfOpen: `recovery_timeout` elapsed, exactly one trial request is let through
//!
//! A successful trial closes the circuit; a failed trial re-opens it and
//! restarts the recovery timeout. This is a plain counter, not a windowed rate.

use parking_lot::Mutex;
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Gauge value is the discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed = 0,
    HalfOpen = 1,
    Open = 2,
}

impl CircuitState {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::HalfOpen => "half_open",
            Self::Open => "open",
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CircuitError<E> {
    /// Open circuit; the operation was never invoked
    #[error("circuit breaker '{circuit}' open, request rejected")]
    Rejected { circuit: String },

    #[error("upstream call failed: {0}")]
    Inner(#[source] E),
}

#[derive(Debug, Clone)]
pub struct CircuitConfig {
    /// Consecutive failures that open the circuit
    pub failure_threshold: u32,
    /// How long to stay open before allowing a trial call
    pub recovery_timeout: Duration,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
        }
    }
}

impl CircuitConfig {
    #[cfg(test)]
    pub fn test() -> Self {
        Self {
            failure_threshold: 2,
            recovery_timeout: Duration::from_millis(50),
        }
    }
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    consecutive_failures: u32,
    last_failure: Option<Instant>,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
}

/// Whether a permitted call is the single half-open trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Permit {
    Normal,
    Trial,
}

/// Resets an abandoned trial (future dropped mid-call) back to open.
struct TrialGuard<'a> {
    breaker: &'a CircuitBreaker,
    armed: bool,
}

impl Drop for TrialGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut s = self.breaker.inner.lock();
            s.trial_in_flight = false;
            s.state = CircuitState::Open;
            s.opened_at = Some(Instant::now());
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    calls: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    rejections: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Point-in-time call counts of one breaker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CallCounts {
    pub calls: u64,
    pub successes: u64,
    /// Calls that failed with an error classified as a failure
    pub failures: u64,
    /// Calls refused while open
    pub rejections: u64,
}

impl CallCounts {
    /// Failures over admitted-or-rejected calls, 0.0 when idle.
    #[must_use]
    pub fn failure_rate(&self) -> f64 {
        if self.calls == 0 {
            0.0
        } else {
            self.failures as f64 / self.calls as f64
        }
    }
}

/// Named breaker guarding one upstream API.
pub struct CircuitBreaker {
    name: String,
    config: CircuitConfig,
    inner: Mutex<BreakerState>,
    counters: Counters,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                last_failure: None,
                opened_at: None,
                trial_in_flight: false,
            }),
            counters: Counters::default(),
        }
    }

    pub fn with_defaults(name: impl Into<String>) -> Self {
        Self::new(name, CircuitConfig::default())
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state. An open circuit whose recovery timeout has elapsed
    /// reports `HalfOpen` even before the trial call is made.
    #[must_use]
    pub fn state(&self) -> CircuitState {
        let s = self.inner.lock();
        match (s.state, s.opened_at) {
            (CircuitState::Open, Some(at)) if at.elapsed() >= self.config.recovery_timeout => {
                CircuitState::HalfOpen
            }
            (state, _) => state,
        }
    }

    #[must_use]
    pub fn consecutive_failures(&self) -> u32 {
        self.inner.lock().consecutive_failures
    }

    #[must_use]
    pub fn last_failure(&self) -> Option<Instant> {
        self.inner.lock().last_failure
    }

    /// Execute an async operation through the circuit breaker.
    ///
    /// Every error counts as a failure.
    pub async fn call<F, Fut, T, E>(&self, f: F) -> Result<T, CircuitError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.call_classified(f, |_| true).await
    }

    /// Execute an async operation, counting only errors accepted by `is_failure`.
    ///
    /// Errors rejected by `is_failure` are returned to the caller but recorded
    /// as a healthy response.
    pub async fn call_classified<F, Fut, T, E, P>(
        &self,
        f: F,
        is_failure: P,
    ) -> Result<T, CircuitError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
    {
        Counters::bump(&self.counters.calls);

        let Some(permit) = self.acquire() else {
            Counters::bump(&self.counters.rejections);
            debug!(circuit = %self.name, "Circuit breaker rejected call (open)");
            crate::metrics::record_circuit_call(&self.name, "rejected");
            return Err(CircuitError::Rejected { circuit: self.name.clone() });
        };

        let mut guard = TrialGuard { breaker: self, armed: permit == Permit::Trial };
        let result = f().await;
        guard.armed = false;
        drop(guard);

        match result {
            Ok(val) => {
                Counters::bump(&self.counters.successes);
                self.on_success(permit);
                crate::metrics::record_circuit_call(&self.name, "success");
                Ok(val)
            }
            Err(e) if is_failure(&e) => {
                Counters::bump(&self.counters.failures);
                self.on_failure(permit);
                crate::metrics::record_circuit_call(&self.name, "failure");
                Err(CircuitError::Inner(e))
            }
            Err(e) => {
                self.on_success(permit);
                crate::metrics::record_circuit_call(&self.name, "ignored");
                Err(CircuitError::Inner(e))
            }
        }
    }

    fn acquire(&self) -> Option<Permit> {
        let mut s = self.inner.lock();
        match s.state {
            CircuitState::Closed => Some(Permit::Normal),
            CircuitState::Open => {
                let ready = s
                    .opened_at
                    .is_some_and(|at| at.elapsed() >= self.config.recovery_timeout);
                if ready {
                    s.state = CircuitState::HalfOpen;
                    s.trial_in_flight = true;
                    info!(circuit = %self.name, "Circuit half-open, allowing trial call");
                    crate::metrics::set_circuit_state(&self.name, CircuitState::HalfOpen as u8);
                    Some(Permit::Trial)
                } else {
                    None
                }
            }
            CircuitState::HalfOpen => {
                if s.trial_in_flight {
                    None
                } else {
                    s.trial_in_flight = true;
                    Some(Permit::Trial)
                }
            }
        }
    }

    fn on_success(&self, permit: Permit) {
        let mut s = self.inner.lock();
        if permit == Permit::Trial {
            s.trial_in_flight = false;
            info!(circuit = %self.name, "Trial call succeeded, circuit closed");
        }
        if s.state != CircuitState::Closed && permit == Permit::Normal {
            // A late success from a call admitted before the circuit opened.
            return;
        }
        s.state = CircuitState::Closed;
        s.consecutive_failures = 0;
        s.opened_at = None;
        crate::metrics::set_circuit_state(&self.name, CircuitState::Closed as u8);
    }

    fn on_failure(&self, permit: Permit) {
        let mut s = self.inner.lock();
        let now = Instant::now();
        s.last_failure = Some(now);
        s.consecutive_failures = s.consecutive_failures.saturating_add(1);

        let trip = match permit {
            Permit::Trial => {
                s.trial_in_flight = false;
                true
            }
            Permit::Normal => {
                s.state == CircuitState::Closed
                    && s.consecutive_failures >= self.config.failure_threshold
            }
        };

        if trip {
            s.state = CircuitState::Open;
            s.opened_at = Some(now);
            warn!(
                circuit = %self.name,
                failures = s.consecutive_failures,
                recovery = ?self.config.recovery_timeout,
                "Circuit opened"
            );
            crate::metrics::set_circuit_state(&self.name, CircuitState::Open as u8);
        }
    }

    #[must_use]
    pub fn counts(&self) -> CallCounts {
        let c = &self.counters;
        CallCounts {
            calls: c.calls.load(Ordering::Relaxed),
            successes: c.successes.load(Ordering::Relaxed),
            failures: c.failures.load(Ordering::Relaxed),
            rejections: c.rejections.load(Ordering::Relaxed),
        }
    }

    /// Zero the call counters. Breaker state is untouched.
    pub fn reset_counts(&self) {
        let c = &self.counters;
        for counter in [&c.calls, &c.successes, &c.failures, &c.rejections] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// Pre-configured circuit breakers, one per upstream API.
pub struct SourceCircuits {
    /// Racing-statistics API (schedules, results, standings)
    pub racing: Arc<CircuitBreaker>,
    /// Telemetry API (sessions, car data)
    pub telemetry: Arc<CircuitBreaker>,
}

impl Default for SourceCircuits {
    fn default() -> Self {
        Self::new(CircuitConfig::default())
    }
}

impl SourceCircuits {
    pub fn new(config: CircuitConfig) -> Self {
        Self {
            racing: Arc::new(CircuitBreaker::new("racing_api", config.clone())),
            telemetry: Arc::new(CircuitBreaker::new("telemetry_api", config)),
        }
    }

    pub fn metrics(&self) -> SourceCircuitMetrics {
        SourceCircuitMetrics {
            racing: BreakerSnapshot::of(&self.racing),
            telemetry: BreakerSnapshot::of(&self.telemetry),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub counts: CallCounts,
}

impl BreakerSnapshot {
    fn of(breaker: &CircuitBreaker) -> Self {
        Self {
            state: breaker.state(),
            consecutive_failures: breaker.consecutive_failures(),
            counts: breaker.counts(),
        }
    }
}

/// Breaker snapshots for both upstream APIs, reported by health checks.
#[derive(Debug, Clone, Serialize)]
pub struct SourceCircuitMetrics {
    pub racing: BreakerSnapshot,
    pub telemetry: BreakerSnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn breaker(threshold: u32, recovery: Duration) -> CircuitBreaker {
        CircuitBreaker::new(
            "test",
            CircuitConfig { failure_threshold: threshold, recovery_timeout: recovery },
        )
    }

    #[tokio::test]
    async fn test_closed_circuit_passes_calls_through() {
        let cb = CircuitBreaker::new("racing_api", CircuitConfig::test());

        let lap: Result<u32, CircuitError<&str>> = cb.call(|| async { Ok(57) }).await;

        assert_eq!(lap.unwrap(), 57);
        let counts = cb.counts();
        assert_eq!((counts.calls, counts.successes, counts.failures), (1, 1, 0));
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_sixth_call_rejected_without_invoking() {
        let cb = breaker(5, Duration::from_secs(60));
        let invoked = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            let i = invoked.clone();
            let r: Result<(), CircuitError<&str>> = cb
                .call(|| async move {
                    i.fetch_add(1, Ordering::SeqCst);
                    Err("down")
                })
                .await;
            assert!(matches!(r, Err(CircuitError::Inner("down"))));
        }
        assert_eq!(cb.state(), CircuitState::Open);

        let i = invoked.clone();
        let r: Result<(), CircuitError<&str>> = cb
            .call(|| async move {
                i.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;

        assert!(matches!(r, Err(CircuitError::Rejected { .. })));
        assert_eq!(invoked.load(Ordering::SeqCst), 5);
        assert_eq!(cb.counts().rejections, 1);
    }

    #[tokio::test]
    async fn test_success_resets_consecutive_count() {
        let cb = breaker(3, Duration::from_secs(60));

        for _ in 0..2 {
            let _: Result<(), CircuitError<&str>> = cb.call(|| async { Err("x") }).await;
        }
        let _: Result<(), CircuitError<&str>> = cb.call(|| async { Ok(()) }).await;
        for _ in 0..2 {
            let _: Result<(), CircuitError<&str>> = cb.call(|| async { Err("x") }).await;
        }

        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.consecutive_failures(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_admits_exactly_one_trial() {
        let cb = Arc::new(breaker(1, Duration::from_secs(60)));
        let _: Result<(), CircuitError<&str>> = cb.call(|| async { Err("down") }).await;
        assert_eq!(cb.state(), CircuitState::Open);

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let trial_cb = cb.clone();
        let trial = tokio::spawn(async move {
            trial_cb
                .call(|| async move {
                    let _ = release_rx.await;
                    Ok::<_, &str>(1)
                })
                .await
        });
        tokio::task::yield_now().await;

        // While the trial is in flight, everything else is rejected.
        let concurrent: Result<i32, CircuitError<&str>> = cb.call(|| async { Ok(2) }).await;
        assert!(matches!(concurrent, Err(CircuitError::Rejected { .. })));

        release_tx.send(()).unwrap();
        assert_eq!(trial.await.unwrap().unwrap(), 1);
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_trial_reopens_and_restarts_timeout() {
        let cb = breaker(2, Duration::from_secs(60));
        for _ in 0..2 {
            let _: Result<(), CircuitError<&str>> = cb.call(|| async { Err("down") }).await;
        }

        tokio::time::advance(Duration::from_secs(60)).await;
        let r: Result<(), CircuitError<&str>> = cb.call(|| async { Err("still down") }).await;
        assert!(matches!(r, Err(CircuitError::Inner("still down"))));
        assert_eq!(cb.state(), CircuitState::Open);

        tokio::time::advance(Duration::from_secs(30)).await;
        let r: Result<(), CircuitError<&str>> = cb.call(|| async { Ok(()) }).await;
        assert!(matches!(r, Err(CircuitError::Rejected { .. })));

        tokio::time::advance(Duration::from_secs(31)).await;
        let r: Result<(), CircuitError<&str>> = cb.call(|| async { Ok(()) }).await;
        assert!(r.is_ok());
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_unclassified_errors_do_not_trip() {
        let cb = breaker(2, Duration::from_secs(60));

        for _ in 0..5 {
            let r: Result<(), CircuitError<&str>> = cb
                .call_classified(|| async { Err("not found") }, |e| *e != "not found")
                .await;
            assert!(matches!(r, Err(CircuitError::Inner("not found"))));
        }

        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.counts().failures, 0);
    }

    #[tokio::test]
    async fn test_last_failure_recorded() {
        let cb = CircuitBreaker::with_defaults("test");
        assert!(cb.last_failure().is_none());

        let _: Result<(), CircuitError<&str>> = cb.call(|| async { Err("x") }).await;
        assert!(cb.last_failure().is_some());
    }

    #[tokio::test]
    async fn test_counts_reset_keeps_state() {
        let cb = breaker(2, Duration::from_secs(60));

        for outcome in [Ok(1), Err("503"), Ok(2), Err("503")] {
            let _: Result<i32, CircuitError<&str>> = cb.call(|| async move { outcome }).await;
        }
        assert!((cb.counts().failure_rate() - 0.5).abs() < 1e-9);
        assert_eq!(cb.state(), CircuitState::Closed);

        cb.reset_counts();
        assert_eq!(cb.counts(), CallCounts::default());
        assert_eq!(cb.counts().failure_rate(), 0.0);
        assert_eq!(cb.consecutive_failures(), 1);
    }

    #[tokio::test]
    async fn test_source_circuits_are_independent() {
        let circuits = SourceCircuits::new(CircuitConfig::test());

        for _ in 0..2 {
            let _: Result<i32, CircuitError<&str>> =
                circuits.racing.call(|| async { Err("down") }).await;
        }
        let _: Result<i32, CircuitError<&str>> = circuits.telemetry.call(|| async { Ok(1) }).await;

        let snapshot = circuits.metrics();
        assert_eq!(snapshot.racing.state, CircuitState::Open);
        assert_eq!(snapshot.racing.counts.failures, 2);
        assert_eq!(snapshot.telemetry.state, CircuitState::Closed);
        assert_eq!(snapshot.telemetry.counts.successes, 1);
        assert_eq!(circuits.racing.name(), "racing_api");
        assert_eq!(circuits.telemetry.name(), "telemetry_api");
    }
}
