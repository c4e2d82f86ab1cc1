// crates/core/src/job.rs
//! One job's record and its lifecycle state machine.
//!
//! Every transition, and the snapshot it emits, happens under a single
//! lock. A cancel request therefore cannot interleave with a tick: either
//! the tick decrements first and the cancel notice follows, or the cancel
//! notice lands first and the tick only ever reports "cancelled".

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::config::Config;
use crate::progress::ProgressSink;
use crate::types::{
    hash_source_url, JobStatus, ProgressSnapshot, TimelapseId, ValidatedRequest,
    REMAINING_CANCELLED, REMAINING_CANCELLING,
};

/// What the scheduler should do after a tick was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Capture frame number `frame` (1-based). `last` means this tick took
    /// `remaining` to zero and the job has left `Active`.
    Capture { frame: u32, last: bool },
    /// Nothing is left to capture; the job is completed.
    Completed,
    /// The job is cancelled. The "cancelled" notice goes out only on the
    /// tick that observes the pending cancel.
    Cancelled,
}

struct JobInner {
    status: JobStatus,
    remaining: u32,
    updated: i64,
}

pub struct TimelapseJob {
    id: TimelapseId,
    source_url: String,
    url_hash: String,
    interval: Duration,
    frames: u32,
    created: i64,
    snapshot_dir: PathBuf,
    output: PathBuf,
    state: Mutex<JobInner>,
    sink: Arc<dyn ProgressSink>,
}

impl TimelapseJob {
    pub fn new(
        id: TimelapseId,
        request: ValidatedRequest,
        config: &Config,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        let now = now_secs();
        Self {
            id,
            url_hash: hash_source_url(&request.url),
            source_url: request.url,
            interval: request.interval,
            frames: request.frames,
            created: now,
            snapshot_dir: config.snapshot_dir(id),
            output: config.output_path(id),
            state: Mutex::new(JobInner {
                status: JobStatus::Active,
                remaining: request.frames,
                updated: now,
            }),
            sink,
        }
    }

    pub fn id(&self) -> TimelapseId {
        self.id
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn frames(&self) -> u32 {
        self.frames
    }

    pub fn snapshot_dir(&self) -> &Path {
        &self.snapshot_dir
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn status(&self) -> JobStatus {
        self.lock().status
    }

    /// Current state as a snapshot, without emitting it.
    pub fn snapshot(&self) -> ProgressSnapshot {
        let inner = self.lock();
        let remaining = match inner.status {
            JobStatus::Active | JobStatus::Completed => i64::from(inner.remaining),
            JobStatus::Cancelling => REMAINING_CANCELLING,
            JobStatus::Cancelled => REMAINING_CANCELLED,
        };
        self.snapshot_with(inner.updated, remaining)
    }

    /// Apply one tick. Only the scheduler that owns this job calls this.
    /// Once the job is terminal, further ticks report that state and emit
    /// nothing.
    pub fn advance(&self) -> Tick {
        let mut inner = self.lock();
        match inner.status {
            JobStatus::Active if inner.remaining == 0 => {
                inner.status = JobStatus::Completed;
                Tick::Completed
            }
            JobStatus::Active => {
                inner.remaining -= 1;
                inner.updated = now_secs();
                self.emit(inner.updated, i64::from(inner.remaining));
                let last = inner.remaining == 0;
                if last {
                    inner.status = JobStatus::Completed;
                }
                Tick::Capture {
                    frame: self.frames - inner.remaining,
                    last,
                }
            }
            JobStatus::Cancelling => {
                inner.updated = now_secs();
                self.emit(inner.updated, REMAINING_CANCELLED);
                inner.status = JobStatus::Cancelled;
                Tick::Cancelled
            }
            JobStatus::Completed => Tick::Completed,
            JobStatus::Cancelled => Tick::Cancelled,
        }
    }

    /// First phase of cancellation: emit the "cancelling" notice, then flip
    /// the job out of `Active`. Returns false, with no side effects, when
    /// the job is no longer active.
    pub fn request_cancel(&self) -> bool {
        let mut inner = self.lock();
        if inner.status != JobStatus::Active {
            return false;
        }
        inner.updated = now_secs();
        self.emit(inner.updated, REMAINING_CANCELLING);
        inner.status = JobStatus::Cancelling;
        true
    }

    fn emit(&self, updated: i64, remaining: i64) {
        self.sink.publish(self.snapshot_with(updated, remaining));
    }

    fn snapshot_with(&self, updated: i64, remaining: i64) -> ProgressSnapshot {
        ProgressSnapshot {
            timelapse_id: self.id,
            rtsp_url_hash: self.url_hash.clone(),
            created: self.created,
            updated,
            interval: self.interval.as_secs_f64(),
            frames: self.frames,
            remaining,
        }
    }

    fn lock(&self) -> MutexGuard<'_, JobInner> {
        self.state.lock().unwrap_or_else(|poisoned| {
            tracing::error!(timelapse_id = %self.id, "Job state lock poisoned; recovering");
            poisoned.into_inner()
        })
    }
}

impl std::fmt::Debug for TimelapseJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimelapseJob")
            .field("id", &self.id)
            .field("url_hash", &self.url_hash)
            .field("interval", &self.interval)
            .field("frames", &self.frames)
            .field("status", &self.status())
            .finish()
    }
}

fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}
