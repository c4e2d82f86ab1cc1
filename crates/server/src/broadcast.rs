// crates/server/src/broadcast.rs
//! Progress broadcaster: fans job snapshots out to every WebSocket subscriber.

use rtsp_timelapse_core::{ProgressSink, ProgressSnapshot};
use tokio::sync::broadcast;

/// Default number of snapshots buffered per subscriber before it starts
/// skipping.
pub const DEFAULT_CAPACITY: usize = 256;

/// Fire-and-forget fan-out over a `tokio::sync::broadcast` channel.
///
/// Publishing never blocks the scheduler: with no subscribers the snapshot
/// is dropped, and a subscriber that falls behind skips the oldest ones.
pub struct ProgressBroadcaster {
    tx: broadcast::Sender<ProgressSnapshot>,
}

impl ProgressBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressSnapshot> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ProgressBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ProgressSink for ProgressBroadcaster {
    fn publish(&self, snapshot: ProgressSnapshot) {
        tracing::debug!(
            timelapse_id = %snapshot.timelapse_id,
            remaining = snapshot.remaining,
            subscribers = self.tx.receiver_count(),
            "Broadcasting progress"
        );
        // No subscribers is fine.
        let _ = self.tx.send(snapshot);
    }
}
