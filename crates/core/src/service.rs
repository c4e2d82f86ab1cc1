// crates/core/src/service.rs
//! Submit / cancel / list facade over the registry and the schedulers.

use std::sync::Arc;

use metrics::counter;
use tokio::task::JoinHandle;

use crate::assemble::FfmpegAssembler;
use crate::capture::{FfmpegCapturer, FrameCapturer};
use crate::config::Config;
use crate::error::TimelapseError;
use crate::finalize::{Finalize, Finalizer};
use crate::job::TimelapseJob;
use crate::notify::WebhookNotifier;
use crate::progress::ProgressSink;
use crate::registry::JobRegistry;
use crate::scheduler::{CaptureScheduler, JobOutcome};
use crate::types::{ProgressSnapshot, TimelapseId, TimelapseRequest};

/// Result of a successful submit.
pub struct Submitted {
    /// Initial state, `remaining == frames`.
    pub snapshot: ProgressSnapshot,
    /// The job's scheduler task. Dropping it detaches the job.
    pub task: JoinHandle<JobOutcome>,
}

pub struct TimelapseService {
    config: Config,
    registry: Arc<JobRegistry>,
    capturer: Arc<dyn FrameCapturer>,
    finalizer: Arc<dyn Finalize>,
}

impl TimelapseService {
    pub fn new(
        config: Config,
        capturer: Arc<dyn FrameCapturer>,
        finalizer: Arc<dyn Finalize>,
    ) -> Self {
        Self {
            config,
            registry: Arc::new(JobRegistry::new()),
            capturer,
            finalizer,
        }
    }

    /// Production wiring: ffmpeg for capture and assembly, webhooks for
    /// notification.
    pub fn from_config(config: Config) -> Self {
        let capturer = Arc::new(FfmpegCapturer::new(config.ffmpeg_path.clone()));
        let finalizer = Finalizer::new(
            Arc::new(FfmpegAssembler::new(config.ffmpeg_path.clone())),
            Arc::new(WebhookNotifier::new(config.notifications.clone())),
        )
        .notify_on_assembly_failure(config.notify_on_assembly_failure);
        Self::new(config, capturer, Arc::new(finalizer))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    /// Validate, register and start a job. Progress goes to `sink`.
    pub async fn submit(
        &self,
        request: TimelapseRequest,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<Submitted, TimelapseError> {
        let request = request.validate()?;
        let id = TimelapseId::new();
        let job = Arc::new(TimelapseJob::new(id, request, &self.config, sink));

        for dir in [job.snapshot_dir(), self.config.output_dir.as_path()] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| TimelapseError::io(dir, e))?;
        }

        let snapshot = job.snapshot();
        self.registry.register(Arc::clone(&job));
        counter!("timelapse_jobs_submitted_total").increment(1);
        tracing::info!(
            timelapse_id = %id,
            interval_secs = snapshot.interval,
            frames = snapshot.frames,
            "Timelapse submitted"
        );

        let scheduler = CaptureScheduler::new(job, Arc::clone(&self.capturer), Arc::clone(&self.finalizer));
        let deregister = Deregister {
            registry: Arc::clone(&self.registry),
            id,
        };
        let task = tokio::spawn(async move {
            let _deregister = deregister;
            scheduler.run().await
        });

        Ok(Submitted { snapshot, task })
    }

    /// Cancel by id string. Unknown or malformed ids are `NotFound`.
    pub fn cancel(&self, id: &str) -> Result<(), TimelapseError> {
        let id: TimelapseId = id.parse()?;
        self.registry.cancel(id)?;
        Ok(())
    }

    pub fn list(&self) -> Vec<ProgressSnapshot> {
        self.registry.list()
    }
}

/// Drops a job from the registry when its scheduler task ends, whether it
/// returns, panics or is aborted.
struct Deregister {
    registry: Arc<JobRegistry>,
    id: TimelapseId,
}

impl Drop for Deregister {
    fn drop(&mut self) {
        if self.registry.remove(self.id).is_some() {
            tracing::debug!(timelapse_id = %self.id, "Job deregistered");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeCapturer, FakeFinalizer, RecordingSink};
    use crate::types::{REMAINING_CANCELLED, REMAINING_CANCELLING};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    struct Fixture {
        _tmp: tempfile::TempDir,
        service: TimelapseService,
        capturer: Arc<FakeCapturer>,
        finalizer: Arc<FakeFinalizer>,
    }

    fn fixture() -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config {
            snapshot_root: tmp.path().join("snapshots"),
            output_dir: tmp.path().join("out"),
            ..Config::default()
        };
        let capturer = Arc::new(FakeCapturer::ok());
        let finalizer = Arc::new(FakeFinalizer::ok());
        let service = TimelapseService::new(config, capturer.clone(), finalizer.clone());
        Fixture {
            _tmp: tmp,
            service,
            capturer,
            finalizer,
        }
    }

    fn request(url: &str, interval: f64, frames: i64) -> TimelapseRequest {
        TimelapseRequest {
            url: Some(url.into()),
            interval: Some(interval),
            frames: Some(frames),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_returns_initial_snapshot_and_runs() {
        let f = fixture();
        let sink = Arc::new(RecordingSink::default());

        let submitted = f.service.submit(request("rtsp://x", 1.0, 3), sink.clone()).await.unwrap();

        assert_eq!(submitted.snapshot.remaining, 3);
        assert_eq!(submitted.snapshot.frames, 3);
        assert_eq!(submitted.snapshot.interval, 1.0);
        let id = submitted.snapshot.timelapse_id;
        assert!(f.service.config().snapshot_dir(id).is_dir());
        assert!(f.service.config().output_dir.is_dir());
        assert_eq!(f.service.list().len(), 1);

        let outcome = submitted.task.await.unwrap();

        assert!(matches!(outcome, JobOutcome::Completed(Ok(_))));
        assert_eq!(sink.remaining_values(), vec![2, 1, 0]);
        assert!(sink.snapshots().iter().all(|s| s.timelapse_id == id));
        assert_eq!(f.capturer.calls().len(), 3);
        assert_eq!(f.finalizer.calls().len(), 1);
        // Finished jobs leave the registry.
        assert!(f.service.list().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_submit_starts_nothing() {
        let f = fixture();
        let sink = Arc::new(RecordingSink::default());

        let err = f
            .service
            .submit(request("rtsp://x", 0.0, 3), sink.clone())
            .await
            .err()
            .unwrap();

        assert!(matches!(err, TimelapseError::Validation(_)));
        assert!(f.service.list().is_empty());
        assert!(sink.remaining_values().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_immediately_after_submit() {
        let f = fixture();
        let sink = Arc::new(RecordingSink::default());
        let submitted = f.service.submit(request("rtsp://x", 1.0, 3), sink.clone()).await.unwrap();
        let id = submitted.snapshot.timelapse_id.to_string();

        f.service.cancel(&id).unwrap();
        let outcome = submitted.task.await.unwrap();

        assert!(matches!(outcome, JobOutcome::Cancelled));
        assert_eq!(
            sink.remaining_values(),
            vec![REMAINING_CANCELLING, REMAINING_CANCELLED]
        );
        assert!(f.capturer.calls().is_empty());
        assert!(f.finalizer.calls().is_empty());
        // Gone from the registry: a second cancel is not found.
        assert!(matches!(f.service.cancel(&id), Err(TimelapseError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_cancel_unknown_or_malformed_id() {
        let f = fixture();
        assert!(matches!(
            f.service.cancel(&TimelapseId::new().to_string()),
            Err(TimelapseError::NotFound(_))
        ));
        assert!(matches!(f.service.cancel("nope"), Err(TimelapseError::NotFound(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_jobs_run_independently() {
        let f = fixture();
        let sink_a = Arc::new(RecordingSink::default());
        let sink_b = Arc::new(RecordingSink::default());
        let a = f.service.submit(request("rtsp://a", 1.0, 2), sink_a.clone()).await.unwrap();
        let b = f.service.submit(request("rtsp://b", 2.0, 2), sink_b.clone()).await.unwrap();

        tokio::time::sleep(Duration::from_millis(500)).await;
        f.service.cancel(&b.snapshot.timelapse_id.to_string()).unwrap();

        assert!(matches!(a.task.await.unwrap(), JobOutcome::Completed(Ok(_))));
        assert!(matches!(b.task.await.unwrap(), JobOutcome::Cancelled));
        assert_eq!(sink_a.remaining_values(), vec![1, 0]);
        assert_eq!(
            sink_b.remaining_values(),
            vec![REMAINING_CANCELLING, REMAINING_CANCELLED]
        );
        assert_ne!(a.snapshot.rtsp_url_hash, b.snapshot.rtsp_url_hash);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_job_still_leaves_registry() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config {
            snapshot_root: tmp.path().join("snapshots"),
            output_dir: tmp.path().join("out"),
            ..Config::default()
        };
        let service = TimelapseService::new(
            config,
            Arc::new(FakeCapturer::ok()),
            Arc::new(FakeFinalizer::panicking()),
        );
        let sink = Arc::new(RecordingSink::default());
        let submitted = service.submit(request("rtsp://x", 1.0, 1), sink).await.unwrap();
        let id = submitted.snapshot.timelapse_id.to_string();

        let err = submitted.task.await.unwrap_err();

        assert!(err.is_panic());
        assert!(service.list().is_empty());
        assert!(matches!(service.cancel(&id), Err(TimelapseError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_unrepresentable_interval_is_rejected_at_submit() {
        let f = fixture();
        let sink = Arc::new(RecordingSink::default());

        for interval in [1e20, 1.5e19] {
            let err = f
                .service
                .submit(request("rtsp://x", interval, 3), sink.clone())
                .await
                .err()
                .unwrap();
            assert!(matches!(err, TimelapseError::Validation(_)));
        }
        assert!(f.service.list().is_empty());
    }
}
