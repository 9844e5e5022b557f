//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by rule, status
//! - `gateway_request_duration_seconds` (histogram): latency by rule
//! - `gateway_fallback_total` (counter): SPA fallback decisions
//! - `gateway_websocket_sessions_active` (gauge): live relay sessions
//! - `gateway_upstream_errors_total` (counter): failed upstream exchanges by rule
//!
//! # Design Decisions
//! - Unrouted requests are labelled `rule="none"`
//! - Recording is free until `init_metrics` installs the exporter

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

pub const REQUESTS_TOTAL: &str = "gateway_requests_total";
pub const REQUEST_DURATION: &str = "gateway_request_duration_seconds";
pub const FALLBACK_TOTAL: &str = "gateway_fallback_total";
pub const WEBSOCKET_SESSIONS_ACTIVE: &str = "gateway_websocket_sessions_active";
pub const UPSTREAM_ERRORS_TOTAL: &str = "gateway_upstream_errors_total";

/// Install the Prometheus exporter with its own scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(method: &str, rule: &str, status: u16, start: Instant) {
    counter!(
        REQUESTS_TOTAL,
        "method" => method.to_string(),
        "rule" => rule.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(REQUEST_DURATION, "rule" => rule.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_fallback(decision: &'static str) {
    counter!(FALLBACK_TOTAL, "decision" => decision).increment(1);
}

pub fn record_upstream_error(rule: &str) {
    counter!(UPSTREAM_ERRORS_TOTAL, "rule" => rule.to_string()).increment(1);
}

pub fn websocket_session_opened() {
    gauge!(WEBSOCKET_SESSIONS_ACTIVE).increment(1.0);
}

pub fn websocket_session_closed() {
    gauge!(WEBSOCKET_SESSIONS_ACTIVE).decrement(1.0);
}
