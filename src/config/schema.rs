//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from the TOML config
//! file. Every section carries defaults so a minimal file is valid.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the user service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,

    /// Rate limiter and circuit breaker policies per downstream resource.
    pub resilience: ResilienceConfig,

    /// Load balancing and passive health settings.
    pub discovery: DiscoveryConfig,

    /// Network instances of downstream services.
    pub instances: Vec<InstanceConfig>,

    /// How department lookups reach the department service.
    pub department: DepartmentConfig,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines instead of the human-readable format.
    pub json_logs: bool,

    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Resilience configuration: a default policy plus per-resource overrides.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ResilienceConfig {
    /// Policy applied to any resource without its own entry.
    pub defaults: ResiliencePolicy,

    /// Per-resource overrides.
    pub resources: Vec<ResourceConfig>,
}

impl ResilienceConfig {
    /// Resolve the effective policy for a resource name.
    pub fn policy_for(&self, resource: &str) -> ResiliencePolicy {
        self.resources
            .iter()
            .find(|r| r.name == resource)
            .map(|r| r.apply(&self.defaults))
            .unwrap_or_else(|| self.defaults.clone())
    }

    /// Effective policies for every configured resource.
    pub fn policies(&self) -> impl Iterator<Item = (&str, ResiliencePolicy)> + '_ {
        self.resources
            .iter()
            .map(|r| (r.name.as_str(), r.apply(&self.defaults)))
    }
}

/// Limiter and breaker parameters for one protected resource.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ResiliencePolicy {
    /// Permits per refill window.
    pub capacity: u32,

    /// Refill window in milliseconds.
    pub refill_window_ms: u64,

    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,

    /// Seconds the circuit stays open before a trial call.
    pub open_timeout_secs: u64,

    /// Deadline for a single remote call in milliseconds.
    pub call_timeout_ms: u64,
}

impl ResiliencePolicy {
    pub fn refill_window(&self) -> Duration {
        Duration::from_millis(self.refill_window_ms)
    }

    pub fn open_timeout(&self) -> Duration {
        Duration::from_secs(self.open_timeout_secs)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

impl Default for ResiliencePolicy {
    fn default() -> Self {
        Self {
            capacity: 10,
            refill_window_ms: 1000,
            failure_threshold: 5,
            open_timeout_secs: 30,
            call_timeout_ms: 2000,
        }
    }
}

/// Per-resource policy entry. Unset fields inherit from the defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResourceConfig {
    /// Logical resource (downstream service) name.
    pub name: String,

    pub capacity: Option<u32>,
    pub refill_window_ms: Option<u64>,
    pub failure_threshold: Option<u32>,
    pub open_timeout_secs: Option<u64>,
    pub call_timeout_ms: Option<u64>,
}

impl ResourceConfig {
    fn apply(&self, defaults: &ResiliencePolicy) -> ResiliencePolicy {
        ResiliencePolicy {
            capacity: self.capacity.unwrap_or(defaults.capacity),
            refill_window_ms: self.refill_window_ms.unwrap_or(defaults.refill_window_ms),
            failure_threshold: self.failure_threshold.unwrap_or(defaults.failure_threshold),
            open_timeout_secs: self.open_timeout_secs.unwrap_or(defaults.open_timeout_secs),
            call_timeout_ms: self.call_timeout_ms.unwrap_or(defaults.call_timeout_ms),
        }
    }
}

/// Instance selection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    #[default]
    RoundRobin,
    LeastConnections,
}

/// Discovery configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Instance selection strategy shared by every service.
    pub strategy: Strategy,

    /// Consecutive failures before an instance is skipped.
    pub unhealthy_threshold: u32,

    /// Consecutive successes before a skipped instance is used again.
    pub healthy_threshold: u32,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::RoundRobin,
            unhealthy_threshold: 3,
            healthy_threshold: 2,
        }
    }
}

/// One network instance of a downstream service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InstanceConfig {
    /// Logical service name this instance serves.
    pub service: String,

    /// Instance address (e.g., "127.0.0.1:9090").
    pub address: String,

    /// Maximum in-flight requests to this instance.
    #[serde(default = "default_max_instance_conns")]
    pub max_connections: usize,
}

fn default_max_instance_conns() -> usize {
    100
}

/// Department lookup settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DepartmentConfig {
    /// Resource (service) name the department service registers under.
    pub service: String,

    /// Request path; `{key}` is replaced with the department id.
    pub path: String,
}

impl Default for DepartmentConfig {
    fn default() -> Self {
        Self {
            service: "department-service".to_string(),
            path: "/api/departments/{key}".to_string(),
        }
    }
}
