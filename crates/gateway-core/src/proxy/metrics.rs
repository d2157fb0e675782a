//! Prometheus-backed metrics for the proxy.
//!
//! Wraps the `metrics` facade with a process-wide `PrometheusHandle` so the
//! server can expose `/metrics` without every call site touching the
//! exporter directly.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
static START: OnceLock<Instant> = OnceLock::new();

/// Installs the global Prometheus recorder. Safe to call multiple times;
/// only the first call takes effect.
pub fn install_recorder() {
    START.get_or_init(Instant::now);
    if HANDLE.get().is_some() {
        return;
    }
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            let _ = HANDLE.set(handle);
        },
        Err(e) => {
            tracing::warn!("Failed to install Prometheus recorder: {}", e);
        },
    }
}

/// Renders the current metrics snapshot in Prometheus text exposition format.
pub fn render_metrics() -> String {
    HANDLE.get().map(|h| h.render()).unwrap_or_default()
}

pub fn record_peek_retry(reason: &'static str) {
    metrics::counter!("gateway_stream_peek_retry_total", "reason" => reason).increment(1);
}

pub fn record_peek_heartbeat() {
    metrics::counter!("gateway_stream_peek_heartbeat_total").increment(1);
}

pub fn record_stream_graceful_finish(protocol: &'static str) {
    metrics::counter!("gateway_stream_graceful_finish_total", "protocol" => protocol).increment(1);
}

pub fn record_stream_abort(protocol: &'static str) {
    metrics::counter!("gateway_stream_abort_total", "protocol" => protocol).increment(1);
}

pub fn record_truncation() {
    metrics::counter!("gateway_response_truncation_total").increment(1);
}

pub fn update_account_gauges(total: usize, available: usize) {
    metrics::gauge!("gateway_accounts_total").set(total as f64);
    metrics::gauge!("gateway_accounts_available").set(available as f64);
}

pub fn update_uptime_gauge() {
    if let Some(start) = START.get() {
        metrics::gauge!("gateway_uptime_seconds").set(start.elapsed().as_secs_f64());
    }
}
