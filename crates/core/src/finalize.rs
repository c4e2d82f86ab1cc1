// crates/core/src/finalize.rs
//! Finalization: assemble → notify → clear the snapshot directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::assemble::VideoAssembler;
use crate::error::TimelapseError;
use crate::notify::{video_ready_message, Notifier};
use crate::types::TimelapseId;

/// Inputs of one finalization run.
#[derive(Debug, Clone)]
pub struct FinalizeJob {
    pub id: TimelapseId,
    pub snapshot_dir: PathBuf,
    pub output: PathBuf,
}

/// Run once per job, only when it completes normally.
#[async_trait]
pub trait Finalize: Send + Sync {
    async fn finalize(&self, job: &FinalizeJob) -> Result<PathBuf, TimelapseError>;
}

/// Default finalization backed by a `VideoAssembler` and a `Notifier`.
pub struct Finalizer {
    assembler: Arc<dyn VideoAssembler>,
    notifier: Arc<dyn Notifier>,
    notify_on_assembly_failure: bool,
}

impl Finalizer {
    pub fn new(assembler: Arc<dyn VideoAssembler>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            assembler,
            notifier,
            notify_on_assembly_failure: false,
        }
    }

    pub fn notify_on_assembly_failure(mut self, enabled: bool) -> Self {
        self.notify_on_assembly_failure = enabled;
        self
    }

    async fn assemble_and_notify(&self, job: &FinalizeJob) -> Result<PathBuf, TimelapseError> {
        let assembled = self.assembler.assemble(&job.snapshot_dir, &job.output).await;
        if let Err(e) = &assembled {
            tracing::error!(timelapse_id = %job.id, error = %e, "Video assembly failed");
            if !self.notify_on_assembly_failure {
                return assembled.map(|()| job.output.clone());
            }
        }

        let attachment = assembled.is_ok().then_some(job.output.as_path());
        let body = match &assembled {
            Ok(()) => video_ready_message(&job.output),
            Err(e) => format!("Timelapse {} could not be assembled: {e}", job.id),
        };
        let notified = self.notifier.notify(&body, attachment).await;
        match &notified {
            Ok(()) => tracing::info!(timelapse_id = %job.id, "Video sent"),
            Err(e) => tracing::error!(timelapse_id = %job.id, error = %e, "Video notification failed"),
        }

        assembled?;
        notified?;
        Ok(job.output.clone())
    }
}

#[async_trait]
impl Finalize for Finalizer {
    async fn finalize(&self, job: &FinalizeJob) -> Result<PathBuf, TimelapseError> {
        // Clears in the foreground if this future is dropped mid-await.
        let cleanup = SnapshotDirCleanup::new(&job.snapshot_dir);
        let result = self.assemble_and_notify(job).await;
        cleanup.clear().await;
        result
    }
}

/// Removes a snapshot directory and everything in it.
///
/// [`clear`](Self::clear) does it on the blocking pool; dropping an
/// uncleared guard does it inline.
pub struct SnapshotDirCleanup {
    dir: Option<PathBuf>,
}

impl SnapshotDirCleanup {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: Some(dir.to_path_buf()),
        }
    }

    pub async fn clear(mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };
        let fallback = dir.clone();
        if let Err(e) = tokio::task::spawn_blocking(move || remove_snapshot_dir(&dir)).await {
            tracing::warn!(path = %fallback.display(), error = %e, "Snapshot cleanup task failed");
            remove_snapshot_dir(&fallback);
        }
    }
}

impl Drop for SnapshotDirCleanup {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            remove_snapshot_dir(&dir);
        }
    }
}

fn remove_snapshot_dir(dir: &Path) {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => tracing::debug!(path = %dir.display(), "Snapshot directory cleared"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(path = %dir.display(), error = %e, "Failed to clear snapshot directory")
        }
    }
}
