// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Retry + circuit breaker composition for upstream calls.
//!
//! Each attempt passes through the breaker, and the retry loop sits outside
//! it. A rejection surfaces as [`SyncError::CircuitOpen`], which is not
//! retryable, so an opening breaker ends the retry loop immediately.

use std::future::Future;
use std::sync::Arc;

use super::circuit_breaker::CircuitBreaker;
use super::retry::{retry_if, RetryConfig};
use crate::error::SyncError;

#[derive(Clone)]
pub struct ResiliencePolicy {
    retry: RetryConfig,
    breaker: Arc<CircuitBreaker>,
}

impl ResiliencePolicy {
    pub fn new(retry: RetryConfig, breaker: Arc<CircuitBreaker>) -> Self {
        Self { retry, breaker }
    }

    #[must_use]
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    #[must_use]
    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Run `operation` under the breaker, retrying transient failures.
    pub async fn run<F, Fut, T>(
        &self,
        operation_name: &str,
        mut operation: F,
    ) -> Result<T, SyncError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SyncError>>,
    {
        retry_if(operation_name, &self.retry, SyncError::is_retryable, || {
            let attempt = operation();
            async move {
                self.breaker
                    .call_classified(|| attempt, SyncError::trips_breaker)
                    .await
                    .map_err(SyncError::from)
            }
        })
        .await
    }
}
