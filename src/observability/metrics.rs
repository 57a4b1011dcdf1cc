//! Metrics collection and exposition.
//!
//! # Metrics
//! - `keyman_requests_total` (counter): requests by method, status
//! - `keyman_request_duration_seconds` (histogram): latency distribution
//! - `keyman_gate_decisions_total` (counter): gate verdicts
//! - `keyman_persist_total` (counter): snapshot writes by outcome
//! - `keyman_store_keys` (gauge): keys currently stored
//! - `keyman_trusted_ranges` (gauge): ranges currently trusted
//!
//! Recording is a no-op until an exporter is installed.

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
    {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Middleware recording request count and latency.
pub async fn track_requests(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let response = next.run(request).await;
    record_request(&method, response.status().as_u16(), start);
    response
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "keyman_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("keyman_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_gate_decision(allowed: bool) {
    let verdict = if allowed { "allow" } else { "deny" };
    metrics::counter!("keyman_gate_decisions_total", "verdict" => verdict).increment(1);
}

pub fn record_persist(outcome: &'static str) {
    metrics::counter!("keyman_persist_total", "outcome" => outcome).increment(1);
}

pub fn record_store_size(keys: usize) {
    metrics::gauge!("keyman_store_keys").set(keys as f64);
}

pub fn record_trusted_ranges(ranges: usize) {
    metrics::gauge!("keyman_trusted_ranges").set(ranges as f64);
}
