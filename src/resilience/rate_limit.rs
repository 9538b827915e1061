//! Per-resource admission control with token buckets.
//!
//! Each protected resource owns one bucket behind its own mutex. The bucket
//! refills continuously at `capacity / refill_window` permits per second and
//! never holds more than `capacity` permits. Admission never waits: a caller
//! either takes a permit now or is rejected now.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use crate::config::{ResilienceConfig, ResiliencePolicy};
use crate::observability::metrics;
use crate::resilience::get_or_create;

/// Mutable part of a bucket.
#[derive(Debug)]
struct Bucket {
    permits: f64,
    last_refill: Instant,
}

/// Token bucket for a single resource.
#[derive(Debug)]
pub struct RateLimiterState {
    capacity: u32,
    refill_window: Duration,
    bucket: Mutex<Bucket>,
}

impl RateLimiterState {
    /// Create a full bucket.
    pub fn new(capacity: u32, refill_window: Duration) -> Self {
        Self {
            capacity,
            refill_window,
            bucket: Mutex::new(Bucket {
                permits: f64::from(capacity),
                last_refill: Instant::now(),
            }),
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Take one permit if available.
    pub fn try_acquire(&self) -> bool {
        let now = Instant::now();
        let mut bucket = self.bucket.lock().unwrap_or_else(PoisonError::into_inner);
        self.refill(&mut bucket, now);

        if bucket.permits >= 1.0 {
            bucket.permits -= 1.0;
            true
        } else {
            false
        }
    }

    /// Whole permits available right now.
    pub fn available_permits(&self) -> u32 {
        let now = Instant::now();
        let mut bucket = self.bucket.lock().unwrap_or_else(PoisonError::into_inner);
        self.refill(&mut bucket, now);
        bucket.permits.floor() as u32
    }

    fn refill(&self, bucket: &mut Bucket, now: Instant) {
        // A clock that went backwards refills nothing and keeps the old mark.
        if now <= bucket.last_refill {
            return;
        }
        let elapsed = now.duration_since(bucket.last_refill);
        let added =
            elapsed.as_secs_f64() / self.refill_window.as_secs_f64() * f64::from(self.capacity);
        bucket.permits = (bucket.permits + added).min(f64::from(self.capacity));
        bucket.last_refill = now;
    }
}

/// Rate limiter for all protected resources.
///
/// Buckets for configured resources are created up front. Unknown resource
/// names get a bucket built from the default policy on first use.
#[derive(Debug)]
pub struct RateLimiter {
    buckets: DashMap<String, Arc<RateLimiterState>>,
    defaults: ResiliencePolicy,
}

impl RateLimiter {
    /// Create a limiter with only a default policy.
    pub fn new(defaults: ResiliencePolicy) -> Self {
        Self {
            buckets: DashMap::new(),
            defaults,
        }
    }

    /// Create a limiter with one bucket per configured resource.
    pub fn from_config(config: &ResilienceConfig) -> Self {
        let limiter = Self::new(config.defaults.clone());
        for (name, policy) in config.policies() {
            limiter.register(name, &policy);
        }
        limiter
    }

    /// Install (or replace) the bucket for a resource.
    pub fn register(&self, resource: &str, policy: &ResiliencePolicy) {
        self.buckets.insert(
            resource.to_string(),
            Arc::new(RateLimiterState::new(policy.capacity, policy.refill_window())),
        );
    }

    /// Admission check for one call attempt against `resource`.
    pub fn try_acquire(&self, resource: &str) -> bool {
        let admitted = self.bucket(resource).try_acquire();
        if !admitted {
            tracing::debug!(resource = %resource, "Rate limit exceeded");
            metrics::record_rate_limited(resource);
        }
        admitted
    }

    pub fn available_permits(&self, resource: &str) -> u32 {
        self.bucket(resource).available_permits()
    }

    fn bucket(&self, resource: &str) -> Arc<RateLimiterState> {
        get_or_create(&self.buckets, resource, || {
            RateLimiterState::new(self.defaults.capacity, self.defaults.refill_window())
        })
    }
}
