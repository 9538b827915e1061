//! Service name resolution.
//!
//! # Responsibilities
//! - Group instances by logical service name
//! - Apply the configured selector to pick an instance
//! - Hand out in-flight guards bounded by max_connections

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{DiscoveryConfig, InstanceConfig, Strategy};
use crate::discovery::{
    instance::{Instance, InstanceGuard, Thresholds},
    least_conn::LeastConnections,
    round_robin::RoundRobin,
    Selector,
};

/// Resolves logical service names to reachable instances.
#[derive(Debug)]
pub struct ServiceRegistry {
    services: HashMap<String, (Vec<Arc<Instance>>, Box<dyn Selector>)>,
}

impl ServiceRegistry {
    /// Build the registry from configuration. Unparsable addresses are skipped.
    pub fn new(instances: &[InstanceConfig], discovery: &DiscoveryConfig) -> Self {
        let thresholds = Thresholds {
            unhealthy: discovery.unhealthy_threshold as usize,
            healthy: discovery.healthy_threshold as usize,
        };

        let mut grouped: HashMap<String, Vec<Arc<Instance>>> = HashMap::new();
        for config in instances {
            match config.address.parse() {
                Ok(addr) => grouped.entry(config.service.clone()).or_default().push(Arc::new(
                    Instance::new(&config.service, addr, config.max_connections, thresholds),
                )),
                Err(_) => {
                    tracing::warn!(service = %config.service, address = %config.address, "Invalid instance address")
                }
            }
        }

        let services = grouped
            .into_iter()
            .map(|(name, instances)| {
                let selector: Box<dyn Selector> = match discovery.strategy {
                    Strategy::RoundRobin => Box::new(RoundRobin::new()),
                    Strategy::LeastConnections => Box::new(LeastConnections::new()),
                };
                (name, (instances, selector))
            })
            .collect();

        Self { services }
    }

    /// Pick an instance of `service` and reserve a request slot on it.
    pub fn resolve(&self, service: &str) -> Option<InstanceGuard> {
        let Some((instances, selector)) = self.services.get(service) else {
            tracing::debug!(service = %service, "Service not found in registry");
            return None;
        };

        let instance = match selector.select(instances) {
            Some(instance) => instance,
            None => {
                // Passive health only recovers on traffic, so with every
                // instance unhealthy the least loaded one still gets probed.
                tracing::debug!(service = %service, instance_count = instances.len(), "No healthy instances");
                instances.iter().min_by_key(|i| i.active_requests())?.clone()
            }
        };

        let guard = instance.try_acquire();
        if guard.is_none() {
            tracing::debug!(service = %service, addr = %instance.addr, "Instance at max connections");
        }
        guard
    }

    /// Every known instance, across services.
    pub fn all_instances(&self) -> Vec<Arc<Instance>> {
        self.services
            .values()
            .flat_map(|(instances, _)| instances.iter())
            .cloned()
            .collect()
    }
}
