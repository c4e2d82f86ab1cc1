// crates/server/src/routes/metrics.rs
//! GET /metrics - Prometheus scrape target. Served at the root, outside
//! `/api`, where scrapers expect it.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use crate::metrics::{record_active_jobs, record_ws_subscribers, render_metrics};
use crate::state::AppState;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Refreshes the point-in-time gauges, then renders. 503 until the recorder
/// is installed.
async fn scrape(State(state): State<Arc<AppState>>) -> Response {
    record_active_jobs(state.service.registry().len());
    record_ws_subscribers(state.broadcaster.subscriber_count());

    let Some(body) = render_metrics() else {
        return (StatusCode::SERVICE_UNAVAILABLE, "Metrics recorder not installed").into_response();
    };
    ([(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], body).into_response()
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/metrics", get(scrape))
}
