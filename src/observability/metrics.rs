//! Metrics collection and exposition.
//!
//! # Metrics
//! - `arbor_requests_total` (counter): requests by method, status
//! - `arbor_request_duration_seconds` (histogram): latency distribution
//! - `arbor_cache_events_total` (counter): load cache hits and misses
//! - `arbor_cache_entries` (gauge): current load cache size
//! - `arbor_sync_files_total` (counter): sync outcomes per file
//!
//! # Design Decisions
//! - Low-overhead updates; recording is safe before the exporter exists
//! - Prometheus exposition on a dedicated listener, as a background task

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on its own listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter started"),
        Err(e) => tracing::error!(error = %e, "Failed to start metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "arbor_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
    )
    .increment(1);
    metrics::histogram!("arbor_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_cache_event(hit: bool) {
    let outcome = if hit { "hit" } else { "miss" };
    metrics::counter!("arbor_cache_events_total", "outcome" => outcome).increment(1);
}

pub fn record_cache_size(len: usize) {
    metrics::gauge!("arbor_cache_entries").set(len as f64);
}

pub fn record_sync_file(outcome: &'static str) {
    metrics::counter!("arbor_sync_files_total", "outcome" => outcome).increment(1);
}
