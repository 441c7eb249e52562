//! Metrics collection and exposition.
//!
//! # Metrics
//! - `friendfi_refresh_total` (counter): refreshes by outcome
//! - `friendfi_submissions_total` (counter): transactions by kind and status
//! - `friendfi_mint_events_total` (counter): observed mints by tier level
//! - `friendfi_listeners` (gauge): live mint listeners
//!
//! Recording is a no-op until a recorder is installed, so library users that
//! never call [`init_metrics`] pay nothing.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record the outcome of a state refresh (`updated`, `skipped`, `superseded`, `failed`).
pub fn record_refresh(outcome: &'static str) {
    metrics::counter!("friendfi_refresh_total", "outcome" => outcome).increment(1);
}

/// Record a transaction submission attempt.
pub fn record_submission(kind: &'static str, success: bool) {
    let status = if success { "submitted" } else { "failed" };
    metrics::counter!("friendfi_submissions_total", "kind" => kind, "status" => status).increment(1);
}

/// Record an observed mint event.
pub fn record_mint_event(level: u8) {
    metrics::counter!("friendfi_mint_events_total", "level" => level.to_string()).increment(1);
}

/// Record the current number of mint listeners.
pub fn record_listener_count(count: usize) {
    metrics::gauge!("friendfi_listeners").set(count as f64);
}
