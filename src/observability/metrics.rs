//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): proxied requests by method, status
//! - `gateway_request_duration_seconds` (histogram): time until the response head
//! - `gateway_backend_ready` (gauge): 1 once the backend has been reached
//! - `gateway_relayed_bytes_total` (counter): body bytes streamed to clients
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with an HTTP scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            gauge!("gateway_backend_ready").set(0.0);
            tracing::info!(address = %addr, "Metrics exporter listening");
        }
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("gateway_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn set_backend_ready() {
    gauge!("gateway_backend_ready").set(1.0);
}

pub fn record_relayed_bytes(bytes: u64) {
    counter!("gateway_relayed_bytes_total").increment(bytes);
}
