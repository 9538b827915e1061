//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! CallRequest for a resource:
//!     → rate_limit.rs (take a permit or reject: RejectedByLimiter)
//!     → circuit_breaker.rs (admit or short-circuit: BreakerOpen)
//!     → timeouts.rs (remote call under its deadline: Timeout)
//!     → circuit_breaker.rs (record success or failure exactly once)
//!     → fallback.rs (substitute payload for any failure reason)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every remote call has a deadline
//! - Limiter before breaker: a rejected admission never consumes the trial
//! - Gates never block; only the remote call suspends
//! - State is per resource, each behind its own lock

use std::sync::Arc;

use dashmap::DashMap;

pub mod circuit_breaker;
pub mod client;
pub mod fallback;
pub mod outcome;
pub mod rate_limit;
pub mod timeouts;

pub use circuit_breaker::{
    Attempt, BreakerSnapshot, CircuitBreaker, CircuitBreakerState, CircuitState,
};
pub use client::ResilientClient;
pub use fallback::FallbackProvider;
pub use outcome::{CallOutcome, CallRequest, FailureReason, FallbackResult, Response};
pub use rate_limit::{RateLimiter, RateLimiterState};

/// Look up per-resource state, creating it on first use.
///
/// The map's shard lock is released before the returned state is used.
pub(crate) fn get_or_create<T>(
    map: &DashMap<String, Arc<T>>,
    resource: &str,
    create: impl FnOnce() -> T,
) -> Arc<T> {
    if let Some(existing) = map.get(resource) {
        return Arc::clone(existing.value());
    }
    Arc::clone(
        map.entry(resource.to_string())
            .or_insert_with(|| Arc::new(create()))
            .value(),
    )
}
