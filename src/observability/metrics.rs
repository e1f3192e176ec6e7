//! Metrics collection and exposition.
//!
//! # Metrics
//! - `polylab_requests_rejected_total` (counter): pipeline rejections by stage
//! - `polylab_sessions_issued_total` (counter): successful logins
//! - `polylab_csrf_tokens_issued_total` (counter): CSRF tokens handed out

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_rejection(stage: &'static str) {
    metrics::counter!("polylab_requests_rejected_total", "stage" => stage).increment(1);
}

pub fn record_session_issued() {
    metrics::counter!("polylab_sessions_issued_total").increment(1);
}

pub fn record_csrf_issued() {
    metrics::counter!("polylab_csrf_tokens_issued_total").increment(1);
}
