//! Metrics collection and exposition.
//!
//! # Metrics
//! - `balancer_selections_total` (counter): selections by policy and backend
//! - `balancer_backend_health` (gauge): 1=UP, 0=DOWN
//! - `balancer_health_checks_total` (counter): probe outcomes by result

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::load_balancer::Policy;

/// Install the Prometheus exporter with an HTTP scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_selection(policy: Policy, backend: &str) {
    metrics::counter!(
        "balancer_selections_total",
        "policy" => policy.as_str(),
        "backend" => backend.to_string()
    )
    .increment(1);
}

pub fn record_backend_health(backend: &str, healthy: bool) {
    metrics::gauge!("balancer_backend_health", "backend" => backend.to_string())
        .set(if healthy { 1.0 } else { 0.0 });
}

pub fn record_health_check(success: bool) {
    let result = if success { "success" } else { "failure" };
    metrics::counter!("balancer_health_checks_total", "result" => result).increment(1);
}
