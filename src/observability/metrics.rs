//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, service
//! - `gateway_request_duration_seconds` (histogram): latency by service
//! - `gateway_retries_total` (counter): proxy retry attempts by service
//! - `gateway_breaker_rejections_total` (counter): fail-fast rejections
//! - `gateway_service_healthy` (gauge): 1=healthy, 0=unhealthy per service
//!
//! # Design Decisions
//! - Rendered by the gateway's own `GET /metrics` endpoint
//! - The Prometheus recorder is installed once per process; every server
//!   instance shares the handle (the metrics facade is global by nature)

use std::sync::OnceLock;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

static RECORDER: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder on first use and return its handle.
pub fn recorder_handle() -> PrometheusHandle {
    RECORDER
        .get_or_init(|| {
            PrometheusBuilder::new()
                .install_recorder()
                .expect("metrics recorder installed once per process")
        })
        .clone()
}

/// Record one handled request (proxied or rejected).
pub fn record_request(method: &str, status: u16, service: &str, started: Instant) {
    counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "service" => service.to_string()
    )
    .increment(1);
    histogram!(
        "gateway_request_duration_seconds",
        "service" => service.to_string()
    )
    .record(started.elapsed().as_secs_f64());
}

/// Record one proxy retry attempt.
pub fn record_retry(service: &str) {
    counter!("gateway_retries_total", "service" => service.to_string()).increment(1);
}

/// Record a fail-fast rejection by an open circuit breaker.
pub fn record_breaker_rejection(service: &str) {
    counter!("gateway_breaker_rejections_total", "service" => service.to_string()).increment(1);
}

/// Reflect a service's probed health.
pub fn record_service_health(service: &str, healthy: bool) {
    gauge!("gateway_service_healthy", "service" => service.to_string())
        .set(if healthy { 1.0 } else { 0.0 });
}
