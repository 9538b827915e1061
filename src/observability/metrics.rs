//! Metrics collection and exposition.
//!
//! # Metrics
//! - `outbound_calls_total` (counter): calls by resource and outcome
//! - `outbound_call_duration_seconds` (histogram): remote call latency
//! - `circuit_breaker_state` (gauge): 0=closed, 1=open, 2=half-open
//! - `rate_limited_total` (counter): admissions rejected by the limiter
//!
//! Recording is a no-op until a recorder is installed, so library users and
//! tests pay nothing for it.

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::resilience::CircuitState;

/// Install the Prometheus recorder with an HTTP scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Count one finished call. `outcome` is `success` or a fallback reason label.
pub fn record_call(resource: &str, outcome: &'static str) {
    metrics::counter!(
        "outbound_calls_total",
        "resource" => resource.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record how long the remote call itself took.
pub fn record_call_duration(resource: &str, elapsed: Duration) {
    metrics::histogram!(
        "outbound_call_duration_seconds",
        "resource" => resource.to_string()
    )
    .record(elapsed.as_secs_f64());
}

pub fn record_rate_limited(resource: &str) {
    metrics::counter!("rate_limited_total", "resource" => resource.to_string()).increment(1);
}

pub fn record_breaker_state(resource: &str, state: CircuitState) {
    let value = match state {
        CircuitState::Closed => 0.0,
        CircuitState::Open => 1.0,
        CircuitState::HalfOpen => 2.0,
    };
    metrics::gauge!("circuit_breaker_state", "resource" => resource.to_string()).set(value);
}
