//! Least-connections instance selection.

use std::sync::Arc;

use crate::discovery::{instance::Instance, Selector};

/// Picks the healthy instance with the fewest in-flight requests.
/// Ties go to the first instance in configuration order.
#[derive(Debug, Default)]
pub struct LeastConnections;

impl LeastConnections {
    pub fn new() -> Self {
        Self
    }
}

impl Selector for LeastConnections {
    fn select(&self, instances: &[Arc<Instance>]) -> Option<Arc<Instance>> {
        instances
            .iter()
            .filter(|instance| instance.is_healthy())
            .min_by_key(|instance| instance.active_requests())
            .cloned()
    }
}
