//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_requests_total` (counter): relay requests by variant, status
//! - `relay_rejections_total` (counter): failed requests by reason
//! - `relay_upstream_status_total` (counter): upstream replies by status
//! - `relay_upstream_duration_seconds` (histogram): upstream latency
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Count a finished relay request.
pub fn record_request(variant: &'static str, status: u16) {
    counter!(
        "relay_requests_total",
        "variant" => variant,
        "status" => status.to_string()
    )
    .increment(1);
}

/// Count a rejected request.
pub fn record_rejection(reason: &'static str) {
    counter!("relay_rejections_total", "reason" => reason).increment(1);
}

/// Record one upstream round trip.
pub fn record_upstream(status: u16, start: Instant) {
    counter!("relay_upstream_status_total", "status" => status.to_string()).increment(1);
    histogram!("relay_upstream_duration_seconds").record(start.elapsed().as_secs_f64());
}
