//! Application metrics for Prometheus monitoring.
//!
//! The core records job and frame counters through the `metrics` facade;
//! this module installs the Prometheus recorder they land in and renders
//! it for `/metrics`.

use metrics::{describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

/// Global Prometheus handle for rendering metrics.
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// Returns `true` if initialization succeeded, `false` if already initialized.
pub fn init_metrics() -> bool {
    if PROMETHEUS_HANDLE.get().is_some() {
        return false;
    }

    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();

    if metrics::set_global_recorder(recorder).is_err() {
        tracing::warn!("Failed to set global metrics recorder (already set)");
        return false;
    }

    if PROMETHEUS_HANDLE.set(handle).is_err() {
        tracing::warn!("Failed to store Prometheus handle (already set)");
    }

    describe_metrics();

    tracing::info!("Prometheus metrics initialized");
    true
}

fn describe_metrics() {
    describe_counter!("timelapse_jobs_submitted_total", "Timelapse jobs accepted");
    describe_counter!(
        "timelapse_jobs_completed_total",
        "Timelapse jobs that reached finalization, by result"
    );
    describe_counter!("timelapse_jobs_cancelled_total", "Timelapse jobs cancelled");
    describe_counter!("timelapse_frames_captured_total", "Frames written by the capturer");
    describe_counter!(
        "timelapse_capture_failures_total",
        "Frame captures that failed and were skipped"
    );
    describe_gauge!("timelapse_ws_subscribers", "Connected progress WebSocket clients");
    describe_gauge!("timelapse_active_jobs", "Jobs registered and not yet terminated");
}

/// Render current metrics in Prometheus text format.
///
/// Returns `None` if metrics are not initialized.
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|h| h.render())
}

/// Record the current number of progress subscribers.
pub fn record_ws_subscribers(count: usize) {
    gauge!("timelapse_ws_subscribers").set(count as f64);
}

/// Record the number of jobs still in the registry.
pub fn record_active_jobs(count: usize) {
    gauge!("timelapse_active_jobs").set(count as f64);
}
