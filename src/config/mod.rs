//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → policies handed to the resilience gates at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Per-resource entries override only the fields they set

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    DepartmentConfig, DiscoveryConfig, InstanceConfig, ObservabilityConfig, ResilienceConfig,
    ResiliencePolicy, ResourceConfig, ServiceConfig, Strategy,
};
pub use validation::ValidationError;
