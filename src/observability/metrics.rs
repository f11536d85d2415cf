//! Metrics collection and exposition.
//!
//! # Metrics
//! - `http_connections_total` (counter): accepted connections
//! - `http_requests_total` (counter): completed requests by method, status
//! - `http_parse_errors_total` (counter): requests rejected by the parser
//! - `http_request_duration_seconds` (histogram): parse-to-finish latency
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_connection() {
    counter!("http_connections_total").increment(1);
}

pub fn record_parse_error() {
    counter!("http_parse_errors_total").increment(1);
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let labels = [("method", method.to_string()), ("status", status.to_string())];
    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(start.elapsed().as_secs_f64());
}
