//! Circuit breaker for downstream protection.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: dependency assumed down, requests fail fast
//! - Half-Open: one trial request is in flight
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures >= failure_threshold
//! Open → Half-Open: open_timeout elapsed, next request becomes the trial
//! Half-Open → Closed: trial succeeds
//! Half-Open → Open: trial fails (open_timeout restarts)
//! ```
//!
//! # Design Decisions
//! - Per-resource circuit breaker (not global), one mutex per resource
//! - Fail fast in Open state
//! - Single probe in Half-Open (prevents hammering a recovering dependency)
//! - Counters reset on every transition
//! - Outcomes reported while Open come from calls admitted before the trip
//!   and are ignored
//! - Every transition starts a new generation; an `Attempt` only reports into
//!   the generation that admitted it, so only the trial resolves Half-Open

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use crate::config::{ResilienceConfig, ResiliencePolicy};
use crate::observability::metrics;
use crate::resilience::{get_or_create, FailureReason};

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "Closed"),
            CircuitState::Open => write!(f, "Open"),
            CircuitState::HalfOpen => write!(f, "HalfOpen"),
        }
    }
}

/// Point-in-time view of one breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerSnapshot {
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u32,
    pub last_transition: Instant,
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    last_transition: Instant,
    generation: u64,
}

/// Circuit breaker for a single resource.
#[derive(Debug)]
pub struct CircuitBreakerState {
    name: String,
    failure_threshold: u32,
    open_timeout: Duration,
    inner: Mutex<Inner>,
}

impl CircuitBreakerState {
    pub fn new(name: impl Into<String>, failure_threshold: u32, open_timeout: Duration) -> Self {
        let name = name.into();
        metrics::record_breaker_state(&name, CircuitState::Closed);
        Self {
            name,
            failure_threshold,
            open_timeout,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                last_transition: Instant::now(),
                generation: 0,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Decide whether a call may proceed.
    ///
    /// Returns false while Open, and while Half-Open because the trial is
    /// already in flight. The caller that observes the timeout expiry is the
    /// one admitted as the trial.
    pub fn allow_request(&self) -> bool {
        self.admit().is_some()
    }

    /// Admit a call and hand back a guard that reports its outcome exactly once.
    pub fn try_begin(self: &Arc<Self>) -> Option<Attempt> {
        self.admit().map(|generation| Attempt {
            breaker: Arc::clone(self),
            generation,
            resolved: false,
        })
    }

    /// Generation the admitted call belongs to, or None when rejected.
    fn admit(&self) -> Option<u64> {
        let now = Instant::now();
        let mut inner = self.lock();

        match inner.state {
            CircuitState::Closed => Some(inner.generation),
            CircuitState::HalfOpen => None,
            CircuitState::Open => {
                if now.saturating_duration_since(inner.last_transition) >= self.open_timeout {
                    self.transition(&mut inner, CircuitState::HalfOpen, now);
                    Some(inner.generation)
                } else {
                    None
                }
            }
        }
    }

    /// Outcome of an attempt admitted in `generation`. Outcomes from an
    /// earlier generation are dropped.
    fn resolve(&self, generation: u64, success: bool) {
        let now = Instant::now();
        let mut inner = self.lock();

        if inner.generation != generation {
            tracing::debug!(
                circuit_breaker = %self.name,
                admitted_in = generation,
                current = inner.generation,
                "Ignoring outcome from an earlier breaker generation"
            );
            return;
        }
        if success {
            self.on_success(&mut inner, now);
        } else {
            self.on_failure(&mut inner, now);
        }
    }

    pub fn record_success(&self) {
        let now = Instant::now();
        let mut inner = self.lock();
        self.on_success(&mut inner, now);
    }

    pub fn record_failure(&self) {
        let now = Instant::now();
        let mut inner = self.lock();
        self.on_failure(&mut inner, now);
    }

    fn on_success(&self, inner: &mut Inner, now: Instant) {
        match inner.state {
            CircuitState::Closed => {
                inner.failure_count = 0;
                inner.success_count = inner.success_count.saturating_add(1);
            }
            CircuitState::HalfOpen => {
                self.transition(inner, CircuitState::Closed, now);
            }
            CircuitState::Open => {}
        }
    }

    fn on_failure(&self, inner: &mut Inner, now: Instant) {
        match inner.state {
            CircuitState::Closed => {
                inner.failure_count = inner.failure_count.saturating_add(1);
                inner.success_count = 0;
                if inner.failure_count >= self.failure_threshold {
                    tracing::warn!(
                        circuit_breaker = %self.name,
                        consecutive_failures = inner.failure_count,
                        failure_threshold = self.failure_threshold,
                        "Circuit breaker opened due to consecutive failures"
                    );
                    self.transition(inner, CircuitState::Open, now);
                }
            }
            CircuitState::HalfOpen => {
                tracing::warn!(
                    circuit_breaker = %self.name,
                    "Circuit breaker re-opened after failed trial call"
                );
                self.transition(inner, CircuitState::Open, now);
            }
            CircuitState::Open => {}
        }
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.lock();
        BreakerSnapshot {
            state: inner.state,
            failure_count: inner.failure_count,
            success_count: inner.success_count,
            last_transition: inner.last_transition,
        }
    }

    /// Force the breaker back to Closed.
    pub fn reset(&self) {
        let now = Instant::now();
        let mut inner = self.lock();
        self.transition(&mut inner, CircuitState::Closed, now);
        tracing::info!(circuit_breaker = %self.name, "Circuit breaker manually reset to Closed");
    }

    fn transition(&self, inner: &mut Inner, to: CircuitState, now: Instant) {
        let from = inner.state;
        inner.state = to;
        inner.failure_count = 0;
        inner.success_count = 0;
        inner.last_transition = now;
        inner.generation = inner.generation.wrapping_add(1);

        if from != to {
            tracing::info!(
                circuit_breaker = %self.name,
                from = %from,
                to = %to,
                "Circuit breaker state change"
            );
            metrics::record_breaker_state(&self.name, to);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // Inner is plain data updated between statements, so a panic elsewhere
        // cannot leave it half-written.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// An admitted call whose outcome has not been reported yet.
///
/// Dropping it unresolved (the caller gave up while the remote call was
/// pending) counts as a failure. An attempt that outlives the breaker state
/// it was admitted under reports nothing.
#[derive(Debug)]
#[must_use = "an unresolved attempt is recorded as a failure when dropped"]
pub struct Attempt {
    breaker: Arc<CircuitBreakerState>,
    generation: u64,
    resolved: bool,
}

impl Attempt {
    pub fn succeed(mut self) {
        self.resolved = true;
        self.breaker.resolve(self.generation, true);
    }

    pub fn fail(mut self) {
        self.resolved = true;
        self.breaker.resolve(self.generation, false);
    }
}

impl Drop for Attempt {
    fn drop(&mut self) {
        if !self.resolved {
            tracing::warn!(
                circuit_breaker = %self.breaker.name(),
                "Call abandoned before completion, counting as timeout"
            );
            metrics::record_call(self.breaker.name(), FailureReason::Timeout.as_str());
            self.breaker.resolve(self.generation, false);
        }
    }
}

/// Circuit breakers for all protected resources.
#[derive(Debug)]
pub struct CircuitBreaker {
    breakers: DashMap<String, Arc<CircuitBreakerState>>,
    defaults: ResiliencePolicy,
}

impl CircuitBreaker {
    pub fn new(defaults: ResiliencePolicy) -> Self {
        Self {
            breakers: DashMap::new(),
            defaults,
        }
    }

    /// Create a breaker per configured resource.
    pub fn from_config(config: &ResilienceConfig) -> Self {
        let breaker = Self::new(config.defaults.clone());
        for (name, policy) in config.policies() {
            breaker.register(name, &policy);
        }
        breaker
    }

    pub fn register(&self, resource: &str, policy: &ResiliencePolicy) {
        self.breakers.insert(
            resource.to_string(),
            Arc::new(CircuitBreakerState::new(
                resource,
                policy.failure_threshold,
                policy.open_timeout(),
            )),
        );
    }

    pub fn allow_request(&self, resource: &str) -> bool {
        self.get(resource).allow_request()
    }

    pub fn begin(&self, resource: &str) -> Option<Attempt> {
        self.get(resource).try_begin()
    }

    pub fn record_success(&self, resource: &str) {
        self.get(resource).record_success();
    }

    pub fn record_failure(&self, resource: &str) {
        self.get(resource).record_failure();
    }

    pub fn state(&self, resource: &str) -> CircuitState {
        self.get(resource).state()
    }

    pub fn snapshot(&self, resource: &str) -> BreakerSnapshot {
        self.get(resource).snapshot()
    }

    pub fn reset(&self, resource: &str) {
        self.get(resource).reset();
    }

    /// Breaker for a resource, created from the default policy if unknown.
    pub fn get(&self, resource: &str) -> Arc<CircuitBreakerState> {
        get_or_create(&self.breakers, resource, || {
            CircuitBreakerState::new(
                resource,
                self.defaults.failure_threshold,
                self.defaults.open_timeout(),
            )
        })
    }
}
