// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Retry logic with exponential backoff and jitter.
//!
//! The delay before attempt `n` (1-based, `n >= 2`) is
//! `initial_delay * factor^(n-2)`, capped at `max_delay`, plus a uniform random
//! jitter in `0..=jitter`. With the default upstream preset that is
//! 1s, 2s, 4s, ... before attempts 2, 3, 4.
//!
//! # Example
//!
//! ```
//! use pitwall_sync::RetryConfig;
//! use std::time::Duration;
//!
//! let upstream = RetryConfig::upstream();
//! assert_eq!(upstream.max_attempts, Some(3));
//! assert_eq!(upstream.initial_delay, Duration::from_secs(1));
//!
//! let startup = RetryConfig::startup();
//! assert_eq!(startup.max_attempts, Some(5));
//! ```

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Configuration for connection/operation retry behavior.
///
/// `max_attempts` is the total number of attempts; `None` retries forever.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub factor: f64,
    pub jitter: Duration,
    pub max_attempts: Option<usize>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::upstream()
    }
}

impl RetryConfig {
    /// Upstream API calls: 3 attempts, 1s base, doubling, up to 250ms jitter.
    #[must_use]
    pub fn upstream() -> Self {
        Self {
            max_attempts: Some(3),
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            factor: 2.0,
            jitter: Duration::from_millis(250),
        }
    }

    /// Fast-fail retry for initial backend connections.
    #[must_use]
    pub fn startup() -> Self {
        Self {
            max_attempts: Some(5),
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
            factor: 2.0,
            jitter: Duration::ZERO,
        }
    }

    /// Short retry for transient database errors (pool exhaustion, dropped connection).
    #[must_use]
    pub fn query() -> Self {
        Self {
            max_attempts: Some(3),
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(500),
            factor: 2.0,
            jitter: Duration::from_millis(25),
        }
    }

    #[cfg(test)]
    pub fn test() -> Self {
        Self {
            max_attempts: Some(3),
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(10),
            factor: 2.0,
            jitter: Duration::ZERO,
        }
    }

    /// Backoff before `attempt` (1-based) without jitter. Attempt 1 has no delay.
    #[must_use]
    pub fn base_delay_for(&self, attempt: usize) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let exponent = i32::try_from(attempt - 2).unwrap_or(i32::MAX);
        let scaled = self.initial_delay.as_secs_f64() * self.factor.powi(exponent);
        Duration::from_secs_f64(scaled.min(self.max_delay.as_secs_f64()))
    }

    fn delay_for(&self, attempt: usize) -> Duration {
        let base = self.base_delay_for(attempt);
        if self.jitter.is_zero() {
            return base;
        }
        let jitter_ms = rand::thread_rng().gen_range(0..=self.jitter.as_millis() as u64);
        base + Duration::from_millis(jitter_ms)
    }
}

/// Retry every failure until the attempt budget is spent.
pub async fn retry<F, Fut, T, E>(operation: &str, config: &RetryConfig, call: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    retry_if(operation, config, |_| true, call).await
}

/// Retry only failures accepted by `should_retry`; anything else is returned
/// immediately.
pub async fn retry_if<F, Fut, T, E, P>(
    operation: &str,
    config: &RetryConfig,
    should_retry: P,
    mut call: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let mut attempt = 1usize;
    loop {
        let err = match call().await {
            Ok(val) => {
                if attempt > 1 {
                    info!(operation, attempt, "Recovered after retry");
                }
                return Ok(val);
            }
            Err(err) => err,
        };

        if !should_retry(&err) {
            return Err(err);
        }
        let exhausted = config.max_attempts.is_some_and(|max| attempt >= max);
        if exhausted {
            warn!(operation, attempts = attempt, error = %err, "Giving up");
            return Err(err);
        }

        attempt += 1;
        let delay = config.delay_for(attempt);
        crate::metrics::record_retry(operation);
        warn!(
            operation,
            next_attempt = attempt,
            max_attempts = ?config.max_attempts,
            ?delay,
            error = %err,
            "Attempt failed, backing off"
        );
        sleep(delay).await;
    }
}
