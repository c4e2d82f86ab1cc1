// crates/core/src/scheduler.rs
//! Capture scheduler: drives one job's tick chain from submission to a
//! terminal state.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::task::JoinSet;
use tokio::time::{self, Instant};

use crate::capture::{frame_path, FrameCapturer};
use crate::error::TimelapseError;
use crate::finalize::{Finalize, FinalizeJob};
use crate::job::{Tick, TimelapseJob};

/// How a job's tick chain ended.
#[derive(Debug)]
pub enum JobOutcome {
    /// Every frame was scheduled and finalization ran; carries its result.
    Completed(Result<PathBuf, TimelapseError>),
    Cancelled,
}

pub struct CaptureScheduler {
    job: Arc<TimelapseJob>,
    capturer: Arc<dyn FrameCapturer>,
    finalizer: Arc<dyn Finalize>,
}

impl CaptureScheduler {
    pub fn new(
        job: Arc<TimelapseJob>,
        capturer: Arc<dyn FrameCapturer>,
        finalizer: Arc<dyn Finalize>,
    ) -> Self {
        Self {
            job,
            capturer,
            finalizer,
        }
    }

    /// Run the tick chain to completion or cancellation.
    ///
    /// Ticks fire at `start + k * interval`. Each tick fixes the next
    /// deadline before doing its own work, and captures run as separate
    /// tasks, so a capture slower than the interval overlaps the next one
    /// instead of delaying it. Finalization waits for every outstanding
    /// capture.
    pub async fn run(self) -> JobOutcome {
        let id = self.job.id();
        let interval = self.job.interval();
        let mut captures = JoinSet::new();

        // A zero-frame job completes on the spot.
        let mut next = if self.job.frames() == 0 {
            Instant::now()
        } else {
            deadline_after(Instant::now(), interval)
        };

        loop {
            time::sleep_until(next).await;
            next = deadline_after(next, interval);
            reap(&mut captures);

            match self.job.advance() {
                Tick::Capture { frame, last } => {
                    tracing::debug!(timelapse_id = %id, frame, "Tick");
                    self.spawn_capture(&mut captures, frame);
                    if last {
                        return self.complete(captures).await;
                    }
                }
                Tick::Completed => return self.complete(captures).await,
                Tick::Cancelled => {
                    drain(&mut captures).await;
                    counter!("timelapse_jobs_cancelled_total").increment(1);
                    tracing::info!(timelapse_id = %id, "Timelapse cancelled");
                    return JobOutcome::Cancelled;
                }
            }
        }
    }

    fn spawn_capture(&self, captures: &mut JoinSet<()>, frame: u32) {
        let id = self.job.id();
        let capturer = Arc::clone(&self.capturer);
        let source = self.job.source_url().to_string();
        let dest = frame_path(self.job.snapshot_dir(), frame);

        captures.spawn(async move {
            match capturer.capture(&source, &dest).await {
                Ok(()) => counter!("timelapse_frames_captured_total").increment(1),
                Err(e) => {
                    // A missed frame never stops the schedule.
                    counter!("timelapse_capture_failures_total").increment(1);
                    tracing::warn!(timelapse_id = %id, frame, error = %e, "Frame capture failed");
                }
            }
        });
    }

    async fn complete(self, mut captures: JoinSet<()>) -> JobOutcome {
        let id = self.job.id();
        drain(&mut captures).await;

        tracing::info!(timelapse_id = %id, "All frames captured; finalizing");
        let job = FinalizeJob {
            id,
            snapshot_dir: self.job.snapshot_dir().to_path_buf(),
            output: self.job.output().to_path_buf(),
        };
        let result = self.finalizer.finalize(&job).await;
        match &result {
            Ok(path) => {
                counter!("timelapse_jobs_completed_total", "result" => "ok").increment(1);
                tracing::info!(timelapse_id = %id, path = %path.display(), "Timelapse completed");
            }
            Err(e) => {
                counter!("timelapse_jobs_completed_total", "result" => "error").increment(1);
                tracing::error!(timelapse_id = %id, error = %e, "Timelapse finalization failed");
            }
        }
        JobOutcome::Completed(result)
    }
}

/// Farthest a single deadline is ever pushed out.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// `from + interval`, clamped to [`FAR_FUTURE`] when the clock cannot
/// represent it.
fn deadline_after(from: Instant, interval: Duration) -> Instant {
    from.checked_add(interval)
        .or_else(|| {
            tracing::warn!(?interval, "Tick deadline out of clock range; clamping");
            from.checked_add(FAR_FUTURE)
        })
        .unwrap_or(from)
}

fn reap(captures: &mut JoinSet<()>) {
    while let Some(res) = captures.try_join_next() {
        if let Err(e) = res {
            tracing::error!(error = %e, "Capture task panicked");
        }
    }
}

async fn drain(captures: &mut JoinSet<()>) {
    while let Some(res) = captures.join_next().await {
        if let Err(e) = res {
            tracing::error!(error = %e, "Capture task panicked");
        }
    }
}
