//! User service with a resilient department client.
//!
//! Outbound department lookups pass through a per-resource rate limiter and
//! circuit breaker, run under a deadline, and fall back to a substitute
//! department on any rejection or failure.

pub mod config;
pub mod departments;
pub mod discovery;
pub mod observability;
pub mod remote;
pub mod resilience;
pub mod users;

pub use config::schema::ServiceConfig;
pub use resilience::ResilientClient;
pub use users::UserService;
