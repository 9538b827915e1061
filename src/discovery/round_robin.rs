//! Round-robin instance selection.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::discovery::{instance::Instance, Selector};

/// Rotates through instances, skipping unhealthy ones.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Selector for RoundRobin {
    fn select(&self, instances: &[Arc<Instance>]) -> Option<Arc<Instance>> {
        if instances.is_empty() {
            return None;
        }

        let start = self.counter.fetch_add(1, Ordering::Relaxed);
        let len = instances.len();

        (0..len)
            .map(|i| &instances[start.wrapping_add(i) % len])
            .find(|instance| instance.is_healthy())
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::instance::Thresholds;

    fn instance(port: u16) -> Arc<Instance> {
        Arc::new(Instance::new(
            "department-service",
            format!("127.0.0.1:{port}").parse().unwrap(),
            100,
            Thresholds {
                unhealthy: 1,
                healthy: 1,
            },
        ))
    }

    #[test]
    fn test_round_robin() {
        let lb = RoundRobin::new();
        let i1 = instance(8080);
        let i2 = instance(8081);
        let instances = vec![i1.clone(), i2.clone()];

        assert_eq!(lb.select(&instances).unwrap().addr, i1.addr);
        assert_eq!(lb.select(&instances).unwrap().addr, i2.addr);
        assert_eq!(lb.select(&instances).unwrap().addr, i1.addr);
    }

    #[test]
    fn test_skips_unhealthy() {
        let lb = RoundRobin::new();
        let i1 = instance(8080);
        let i2 = instance(8081);
        i1.mark_failure();
        let instances = vec![i1, i2.clone()];

        for _ in 0..3 {
            assert_eq!(lb.select(&instances).unwrap().addr, i2.addr);
        }

        i2.mark_failure();
        assert!(lb.select(&instances).is_none());
    }
}
