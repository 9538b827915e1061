//! Service discovery subsystem.
//!
//! # Data Flow
//! ```text
//! Remote call for a service name
//!     → registry.rs (look up the service's instances)
//!     → Apply the selection strategy:
//!         - round_robin.rs (rotate through healthy instances)
//!         - least_conn.rs (pick the instance with fewest in-flight requests)
//!     → instance.rs (reserve a request slot, report health afterwards)
//! ```
//!
//! # Design Decisions
//! - Selectors are stateless apart from the round-robin counter
//! - Unhealthy instances are excluded from selection
//! - Health is passive: fed by remote call outcomes

use std::fmt::Debug;
use std::sync::Arc;

pub mod instance;
pub mod least_conn;
pub mod registry;
pub mod round_robin;

pub use instance::{HealthState, Instance, InstanceGuard};
pub use registry::ServiceRegistry;

/// Instance selection strategy.
pub trait Selector: Send + Sync + Debug {
    /// Pick one instance, or None if no instance is eligible.
    fn select(&self, instances: &[Arc<Instance>]) -> Option<Arc<Instance>>;
}
