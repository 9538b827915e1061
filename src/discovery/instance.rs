//! A single network instance of a downstream service.
//!
//! # Responsibilities
//! - Track in-flight requests (for least connections and max_connections)
//! - Track passive health (Healthy/Unhealthy) with hysteresis

use std::net::SocketAddr;
use std::ops::Deref;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;

/// Health state of an instance.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Unknown = 0,
    Healthy = 1,
    Unhealthy = 2,
}

impl From<u8> for HealthState {
    fn from(val: u8) -> Self {
        match val {
            1 => HealthState::Healthy,
            2 => HealthState::Unhealthy,
            _ => HealthState::Unknown,
        }
    }
}

/// Health thresholds applied to every instance.
#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    pub unhealthy: usize,
    pub healthy: usize,
}

#[derive(Debug)]
pub struct Instance {
    pub service: String,
    pub addr: SocketAddr,
    pub max_connections: usize,
    thresholds: Thresholds,
    active_requests: AtomicUsize,
    state: AtomicU8,
    consecutive_failures: AtomicUsize,
    consecutive_successes: AtomicUsize,
}

impl Instance {
    pub fn new(
        service: impl Into<String>,
        addr: SocketAddr,
        max_connections: usize,
        thresholds: Thresholds,
    ) -> Self {
        Self {
            service: service.into(),
            addr,
            max_connections,
            thresholds,
            active_requests: AtomicUsize::new(0),
            state: AtomicU8::new(HealthState::Unknown as u8),
            consecutive_failures: AtomicUsize::new(0),
            consecutive_successes: AtomicUsize::new(0),
        }
    }

    pub fn active_requests(&self) -> usize {
        self.active_requests.load(Ordering::Relaxed)
    }

    pub fn health(&self) -> HealthState {
        HealthState::from(self.state.load(Ordering::Relaxed))
    }

    /// Healthy or not yet observed.
    pub fn is_healthy(&self) -> bool {
        self.health() != HealthState::Unhealthy
    }

    /// Reserve an in-flight slot, failing when max_connections is reached.
    pub fn try_acquire(self: &Arc<Self>) -> Option<InstanceGuard> {
        let mut prev = self.active_requests.load(Ordering::Relaxed);
        loop {
            if prev >= self.max_connections {
                return None;
            }
            match self.active_requests.compare_exchange_weak(
                prev,
                prev + 1,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(x) => prev = x,
            }
        }
        Some(InstanceGuard {
            instance: self.clone(),
        })
    }

    /// Report a successful request.
    pub fn mark_success(&self) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
        if self.health() == HealthState::Healthy {
            return;
        }

        let successes = self.consecutive_successes.fetch_add(1, Ordering::Relaxed) + 1;
        if successes >= self.thresholds.healthy {
            self.state.store(HealthState::Healthy as u8, Ordering::Relaxed);
            self.consecutive_successes.store(0, Ordering::Relaxed);
            tracing::info!(service = %self.service, addr = %self.addr, "Instance marked healthy");
        }
    }

    /// Report a failed request.
    pub fn mark_failure(&self) {
        self.consecutive_successes.store(0, Ordering::Relaxed);
        if self.health() == HealthState::Unhealthy {
            return;
        }

        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        if failures >= self.thresholds.unhealthy {
            self.state.store(HealthState::Unhealthy as u8, Ordering::Relaxed);
            self.consecutive_failures.store(0, Ordering::Relaxed);
            tracing::warn!(service = %self.service, addr = %self.addr, "Instance marked unhealthy");
        }
    }
}

/// RAII guard over one in-flight request slot.
#[derive(Debug)]
pub struct InstanceGuard {
    instance: Arc<Instance>,
}

impl Deref for InstanceGuard {
    type Target = Instance;
    fn deref(&self) -> &Self::Target {
        &self.instance
    }
}

impl Drop for InstanceGuard {
    fn drop(&mut self) {
        self.instance.active_requests.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(max: usize) -> Arc<Instance> {
        Arc::new(Instance::new(
            "department-service",
            "127.0.0.1:9090".parse().unwrap(),
            max,
            Thresholds {
                unhealthy: 2,
                healthy: 2,
            },
        ))
    }

    #[test]
    fn test_guard_tracks_in_flight_requests() {
        let inst = instance(2);
        let g1 = inst.try_acquire().unwrap();
        let g2 = inst.try_acquire().unwrap();
        assert!(inst.try_acquire().is_none());
        assert_eq!(inst.active_requests(), 2);

        drop(g1);
        assert_eq!(inst.active_requests(), 1);
        drop(g2);
        assert_eq!(inst.active_requests(), 0);
    }

    #[test]
    fn test_health_hysteresis() {
        let inst = instance(10);
        assert_eq!(inst.health(), HealthState::Unknown);
        assert!(inst.is_healthy());

        inst.mark_failure();
        assert!(inst.is_healthy());
        inst.mark_failure();
        assert_eq!(inst.health(), HealthState::Unhealthy);

        inst.mark_success();
        assert_eq!(inst.health(), HealthState::Unhealthy);
        inst.mark_success();
        assert_eq!(inst.health(), HealthState::Healthy);
    }
}
