// crates/server/src/state.rs
//! Application state for the Axum server.

use std::sync::Arc;
use std::time::Instant;

use rtsp_timelapse_core::TimelapseService;

use crate::broadcast::ProgressBroadcaster;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    /// Server start time for uptime tracking.
    pub start_time: Instant,
    /// Job submission, cancellation and listing.
    pub service: Arc<TimelapseService>,
    /// Fan-out of job progress to WebSocket subscribers.
    pub broadcaster: Arc<ProgressBroadcaster>,
}

impl AppState {
    pub fn new(service: TimelapseService) -> Arc<Self> {
        Arc::new(Self {
            start_time: Instant::now(),
            service: Arc::new(service),
            broadcaster: Arc::new(ProgressBroadcaster::default()),
        })
    }

    /// Get the server uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
