//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_http_requests_total` (counter): requests by route, status
//! - `relay_http_request_duration_seconds` (histogram): handler latency
//! - `relay_provider_calls_total` (counter): provider calls by provider, outcome
//! - `relay_provider_call_duration_seconds` (histogram): provider latency
//! - `relay_trace_ids_generated_total` (counter): identifiers minted locally
//!
//! # Design Decisions
//! - Uses the `metrics` facade; without an installed recorder every call is a no-op
//! - Prometheus exposition on a separate listener

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one handled HTTP request.
pub fn record_request(route: &'static str, status: u16, start: Instant) {
    metrics::counter!(
        "relay_http_requests_total",
        "route" => route,
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("relay_http_request_duration_seconds", "route" => route)
        .record(start.elapsed().as_secs_f64());
}

/// Record one provider call.
pub fn record_provider_call(provider: &str, success: bool, start: Instant) {
    let outcome = if success { "success" } else { "error" };
    metrics::counter!(
        "relay_provider_calls_total",
        "provider" => provider.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!("relay_provider_call_duration_seconds", "provider" => provider.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// Record a locally minted trace identifier.
pub fn record_trace_id_generated() {
    metrics::counter!("relay_trace_ids_generated_total").increment(1);
}

/// Record a span discarded because the export queue was full.
pub fn record_span_dropped() {
    metrics::counter!("relay_telemetry_spans_dropped_total").increment(1);
}
