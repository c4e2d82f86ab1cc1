// crates/core/src/progress.rs
//! Progress sink seam between the scheduler and whatever delivers snapshots.

use crate::types::ProgressSnapshot;

/// Receives every progress snapshot a job emits.
///
/// Called while the job's state lock is held, so implementations must not
/// block: hand the snapshot off (channel send, buffer push) and return.
/// Delivery failures are the sink's own business and never reach the
/// scheduler.
pub trait ProgressSink: Send + Sync {
    fn publish(&self, snapshot: ProgressSnapshot);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressSnapshot) + Send + Sync,
{
    fn publish(&self, snapshot: ProgressSnapshot) {
        self(snapshot)
    }
}

/// Sink that drops everything. Useful for callers that only poll `list()`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn publish(&self, _snapshot: ProgressSnapshot) {}
}
