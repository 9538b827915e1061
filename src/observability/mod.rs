//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Gates and client produce:
//!     → logging.rs (structured log events, one span per call)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```

pub mod logging;
pub mod metrics;
