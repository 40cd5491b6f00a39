// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Resilience for upstream calls: retry with backoff, circuit breakers, and
//! the composed [`policy::ResiliencePolicy`].

pub mod circuit_breaker;
pub mod policy;
pub mod retry;

pub use circuit_breaker::{
    BreakerSnapshot, CallCounts, CircuitBreaker, CircuitConfig, CircuitError, CircuitState,
    SourceCircuitMetrics, SourceCircuits,
};
pub use policy::ResiliencePolicy;
pub use retry::RetryConfig;
