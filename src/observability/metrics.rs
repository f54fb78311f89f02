//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by vhost, method, status
//! - `proxy_request_duration_seconds` (histogram): time to response head, by vhost
//!
//! # Design Decisions
//! - Labels use the matched vhost key, or `default` for the fallback
//! - The Prometheus exporter is optional; without it recording is a no-op

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its scrape listener. Requires a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, vhost: &str, start: Instant) {
    metrics::counter!(
        "proxy_requests_total",
        "vhost" => vhost.to_string(),
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("proxy_request_duration_seconds", "vhost" => vhost.to_string())
        .record(start.elapsed().as_secs_f64());
}
