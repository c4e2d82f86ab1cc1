// crates/server/src/lib.rs
//! Timelapse server library.
//!
//! Axum HTTP + WebSocket front end for the timelapse core: job submission
//! and cancellation over REST, progress fan-out over `/ws`.

pub mod broadcast;
pub mod error;
pub mod metrics;
pub mod routes;
pub mod state;

pub use broadcast::ProgressBroadcaster;
pub use error::*;
pub use metrics::{init_metrics, render_metrics};
pub use routes::api_routes;
pub use state::AppState;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

/// Create the Axum application with all routes and middleware.
///
/// This sets up:
/// - API routes (health, timelapses, ws), `/ws` and `/metrics`
/// - the UI bundle from `static_dir`, when given, for every other path
/// - CORS (allows any origin)
/// - Request tracing
pub fn create_app(state: Arc<AppState>, static_dir: Option<PathBuf>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = api_routes(state);
    if let Some(dir) = static_dir {
        tracing::info!(path = %dir.display(), "Serving static UI");
        let index = dir.join("index.html");
        app = app.fallback_service(ServeDir::new(dir).fallback(ServeFile::new(index)));
    }

    app.layer(cors).layer(TraceLayer::new_for_http())
}

// ============================================================================
// Integration Tests
// ============================================================================
