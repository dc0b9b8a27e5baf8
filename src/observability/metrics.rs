//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by status and service
//! - `gateway_request_duration_seconds` (histogram): latency by service
//! - `gateway_service_status` (gauge): 1=UP, 0 otherwise
//! - `gateway_registry_services` (gauge): number of registered services
//! - `gateway_snapshot_failures_total` (counter): failed snapshot writes
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op, which keeps tests free of globals
//! - The Prometheus exporter is optional and runs on its own listener
//! - The `metrics` facade cannot unregister a series, so gauges expire
//!   after going idle. The health monitor refreshes every live service's
//!   gauge each tick; a removed service's series is dropped once it stops
//!   being refreshed

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use metrics_exporter_prometheus::PrometheusBuilder;
use metrics_util::MetricKindMask;

use crate::registry::ServiceStatus;

fn builder(gauge_idle: Option<Duration>) -> PrometheusBuilder {
    PrometheusBuilder::new().idle_timeout(MetricKindMask::GAUGE, gauge_idle)
}

/// Install the Prometheus recorder and its scrape listener.
///
/// Gauges not updated within `gauge_idle` are removed from the output.
pub fn init_metrics(addr: SocketAddr, gauge_idle: Option<Duration>) {
    match builder(gauge_idle).with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one handled request. `service` is "none" when nothing matched.
pub fn record_request(status: u16, service: &str, start: Instant) {
    metrics::counter!(
        "gateway_requests_total",
        "status" => status.to_string(),
        "service" => service.to_string()
    )
    .increment(1);
    metrics::histogram!(
        "gateway_request_duration_seconds",
        "service" => service.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_service_status(service: &str, status: ServiceStatus) {
    let value = if status == ServiceStatus::Up { 1.0 } else { 0.0 };
    metrics::gauge!("gateway_service_status", "service" => service.to_string()).set(value);
}

/// Mark a removed service as not serving until its series expires.
pub fn clear_service_status(service: &str) {
    metrics::gauge!("gateway_service_status", "service" => service.to_string()).set(0.0);
}

pub fn record_registry_size(count: usize) {
    metrics::gauge!("gateway_registry_services").set(count as f64);
}

pub fn record_snapshot_failure() {
    metrics::counter!("gateway_snapshot_failures_total").increment(1);
}
