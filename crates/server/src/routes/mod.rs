//! API route handlers for the timelapse server.

pub mod health;
pub mod metrics;
pub mod timelapses;
pub mod ws;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Create the combined router.
///
/// Routes:
/// - GET    /api/health            - Health check
/// - POST   /api/timelapses        - Submit a timelapse job
/// - GET    /api/timelapses        - List jobs that have not terminated
/// - DELETE /api/timelapses/{id}   - Cancel a job
/// - GET    /api/ws                - WebSocket progress stream (also at /ws)
/// - GET    /metrics               - Prometheus metrics
pub fn api_routes(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .merge(health::router())
        .merge(timelapses::router())
        .merge(ws::router());

    Router::new()
        .nest("/api", api)
        .merge(ws::router())
        .merge(metrics::router())
        .with_state(state)
}
