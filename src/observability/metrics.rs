//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define server metrics (requests, latency, errors, async results, sessions)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `kiln_requests_total` (counter): total requests by method, status
//! - `kiln_request_duration_seconds` (histogram): dispatch latency
//! - `kiln_errors_total` (counter): resolved failures by error kind
//! - `kiln_async_results_total` (counter): async completions by outcome
//! - `kiln_ws_sessions` (gauge): live WebSocket sessions
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Labels for method, status code and error kind only (bounded cardinality)

use std::net::SocketAddr;
use std::time::Duration;

use axum::http::{Method, StatusCode};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter and its scrape endpoint on `addr`.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &Method, status: StatusCode, elapsed: Duration) {
    counter!(
        "kiln_requests_total",
        "method" => method.to_string(),
        "status" => status.as_u16().to_string()
    )
    .increment(1);
    histogram!("kiln_request_duration_seconds").record(elapsed.as_secs_f64());
}

pub fn record_error(kind: &str) {
    counter!("kiln_errors_total", "kind" => kind.to_string()).increment(1);
}

pub fn record_async_result(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!("kiln_async_results_total", "outcome" => outcome).increment(1);
}

pub fn record_ws_sessions(count: usize) {
    gauge!("kiln_ws_sessions").set(count as f64);
}
