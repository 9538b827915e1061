//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (capacities, windows and timeouts > 0)
//! - Detect duplicate resource entries and unparsable instance addresses
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before the config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use crate::config::schema::{ResiliencePolicy, ServiceConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    Zero { field: String },

    #[error("resource `{0}` is configured more than once")]
    DuplicateResource(String),

    #[error("resource entry has an empty name")]
    EmptyResourceName,

    #[error("instance address `{address}` for `{service}` is not a socket address")]
    InvalidAddress { service: String, address: String },

    #[error("instance for `{0}` allows zero connections")]
    ZeroConnections(String),

    #[error("department.path must contain the `{{key}}` placeholder")]
    MissingKeyPlaceholder,

    #[error("invalid metrics address `{0}`")]
    InvalidMetricsAddress(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_policy("resilience.defaults", &config.resilience.defaults, &mut errors);

    let mut seen = HashSet::new();
    for resource in &config.resilience.resources {
        if resource.name.is_empty() {
            errors.push(ValidationError::EmptyResourceName);
            continue;
        }
        if !seen.insert(resource.name.as_str()) {
            errors.push(ValidationError::DuplicateResource(resource.name.clone()));
        }
    }
    for (name, policy) in config.resilience.policies() {
        if !name.is_empty() {
            check_policy(&format!("resilience.resources.{name}"), &policy, &mut errors);
        }
    }

    if config.discovery.unhealthy_threshold == 0 {
        errors.push(zero("discovery.unhealthy_threshold"));
    }
    if config.discovery.healthy_threshold == 0 {
        errors.push(zero("discovery.healthy_threshold"));
    }

    for instance in &config.instances {
        if instance.address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::InvalidAddress {
                service: instance.service.clone(),
                address: instance.address.clone(),
            });
        }
        if instance.max_connections == 0 {
            errors.push(ValidationError::ZeroConnections(instance.service.clone()));
        }
    }

    if !config.department.path.contains("{key}") {
        errors.push(ValidationError::MissingKeyPlaceholder);
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_policy(prefix: &str, policy: &ResiliencePolicy, errors: &mut Vec<ValidationError>) {
    if policy.capacity == 0 {
        errors.push(zero(&format!("{prefix}.capacity")));
    }
    if policy.refill_window_ms == 0 {
        errors.push(zero(&format!("{prefix}.refill_window_ms")));
    }
    if policy.failure_threshold == 0 {
        errors.push(zero(&format!("{prefix}.failure_threshold")));
    }
    if policy.open_timeout_secs == 0 {
        errors.push(zero(&format!("{prefix}.open_timeout_secs")));
    }
    if policy.call_timeout_ms == 0 {
        errors.push(zero(&format!("{prefix}.call_timeout_ms")));
    }
}

fn zero(field: &str) -> ValidationError {
    ValidationError::Zero {
        field: field.to_string(),
    }
}
