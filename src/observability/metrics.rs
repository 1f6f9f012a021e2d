//! Metrics collection and exposition.
//!
//! # Metrics
//! - `odoh_flows_total` (counter): flows by `kind` (tcp/udp) and `outcome`
//! - `odoh_relay_requests_total` (counter): HTTP requests by `kind`
//!   (config/query) and `status`
//! - `odoh_relay_duration_seconds` (histogram): HTTP round-trip latency
//! - `odoh_bootstrap_total` (counter): bootstrap attempts by `outcome`

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with an HTTP listener on `addr`.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Count one finished (or declined) flow.
pub fn record_flow(kind: &'static str, outcome: &'static str) {
    ::metrics::counter!("odoh_flows_total", "kind" => kind, "outcome" => outcome).increment(1);
}

/// Count one HTTP request and record its latency.
pub fn record_relay(kind: &'static str, status: &str, start: Instant) {
    ::metrics::counter!(
        "odoh_relay_requests_total",
        "kind" => kind,
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!("odoh_relay_duration_seconds", "kind" => kind)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_bootstrap(outcome: &'static str) {
    ::metrics::counter!("odoh_bootstrap_total", "outcome" => outcome).increment(1);
}
