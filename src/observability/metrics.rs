//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define lifecycle metrics (service starts, stops, failures)
//! - Expose Prometheus-compatible metrics endpoint when enabled
//!
//! # Metrics
//! - `engine_services_started_total` (counter): services that finished `start`, by service
//! - `engine_services_stopped_total` (counter): clean service exits, by service
//! - `engine_services_failed_total` (counter): failed service exits, by service and kind
//! - `engine_launcher_running_services` (gauge): services currently supervised
//! - `engine_heartbeat_failures_total` (counter): failed database heartbeats
//!
//! # Design Decisions
//! - Recording without an installed exporter is a no-op, so tests need no setup
//! - Exporter install failure is logged, never fatal

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_service_started(service: &str) {
    ::metrics::counter!("engine_services_started_total", "service" => service.to_string())
        .increment(1);
}

pub fn record_service_stopped(service: &str) {
    ::metrics::counter!("engine_services_stopped_total", "service" => service.to_string())
        .increment(1);
}

pub fn record_service_failed(service: &str, kind: &'static str) {
    ::metrics::counter!(
        "engine_services_failed_total",
        "service" => service.to_string(),
        "kind" => kind
    )
    .increment(1);
}

pub fn record_running_services(count: usize) {
    ::metrics::gauge!("engine_launcher_running_services").set(count as f64);
}

pub fn record_heartbeat_failure(topic: &str) {
    ::metrics::counter!("engine_heartbeat_failures_total", "topic" => topic.to_string())
        .increment(1);
}
