// crates/core/src/testing.rs
//! In-memory collaborators for exercising the scheduler without ffmpeg or
//! network access.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::assemble::VideoAssembler;
use crate::capture::FrameCapturer;
use crate::error::TimelapseError;
use crate::finalize::{Finalize, FinalizeJob};
use crate::notify::Notifier;
use crate::progress::ProgressSink;
use crate::types::ProgressSnapshot;

/// Sink that keeps every snapshot it receives.
#[derive(Default)]
pub struct RecordingSink {
    snapshots: Mutex<Vec<ProgressSnapshot>>,
}

impl RecordingSink {
    pub fn snapshots(&self) -> Vec<ProgressSnapshot> {
        self.snapshots.lock().unwrap().clone()
    }

    pub fn remaining_values(&self) -> Vec<i64> {
        self.snapshots().iter().map(|s| s.remaining).collect()
    }
}

impl ProgressSink for RecordingSink {
    fn publish(&self, snapshot: ProgressSnapshot) {
        self.snapshots.lock().unwrap().push(snapshot);
    }
}

/// A recorded capture call.
#[derive(Debug, Clone)]
pub struct CaptureCall {
    pub source: String,
    pub dest: PathBuf,
    pub at: Instant,
}

/// Capturer that records calls, optionally takes time and optionally fails.
#[derive(Default)]
pub struct FakeCapturer {
    calls: Mutex<Vec<CaptureCall>>,
    delay: Duration,
    fail: bool,
}

impl FakeCapturer {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<CaptureCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FrameCapturer for FakeCapturer {
    async fn capture(&self, source: &str, dest: &Path) -> Result<(), TimelapseError> {
        self.calls.lock().unwrap().push(CaptureCall {
            source: source.to_string(),
            dest: dest.to_path_buf(),
            at: Instant::now(),
        });
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(TimelapseError::capture(dest, "stream unreachable"));
        }
        Ok(())
    }
}

/// Finalizer that records when it ran.
#[derive(Default)]
pub struct FakeFinalizer {
    calls: Mutex<Vec<(FinalizeJob, Instant)>>,
    fail: bool,
    panic: bool,
}

impl FakeFinalizer {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Panics inside `finalize`, taking the scheduler task down with it.
    pub fn panicking() -> Self {
        Self {
            panic: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<(FinalizeJob, Instant)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Finalize for FakeFinalizer {
    async fn finalize(&self, job: &FinalizeJob) -> Result<PathBuf, TimelapseError> {
        self.calls.lock().unwrap().push((job.clone(), Instant::now()));
        if self.panic {
            panic!("finalizer blew up for {}", job.id);
        }
        if self.fail {
            return Err(TimelapseError::assembly(&job.output, "no frames"));
        }
        Ok(job.output.clone())
    }
}

/// Ordered record of collaborator calls shared between fakes. Each entry
/// notes how many frames were in the watched directory at call time.
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<String>>>,
    watched: Option<PathBuf>,
}

impl EventLog {
    pub fn watching(dir: &Path) -> Self {
        Self {
            events: Arc::default(),
            watched: Some(dir.to_path_buf()),
        }
    }

    pub fn record(&self, what: &str) {
        let frames = self
            .watched
            .as_deref()
            .and_then(|dir| std::fs::read_dir(dir).ok())
            .map(|entries| entries.count())
            .unwrap_or(0);
        self.events.lock().unwrap().push(format!("{what} ({frames} frames)"));
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

#[derive(Default)]
pub struct FakeAssembler {
    calls: Mutex<Vec<(PathBuf, PathBuf)>>,
    fail: bool,
    log: Option<EventLog>,
}

impl FakeAssembler {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn with_log(mut self, log: EventLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn calls(&self) -> Vec<(PathBuf, PathBuf)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl VideoAssembler for FakeAssembler {
    async fn assemble(&self, snapshot_dir: &Path, output: &Path) -> Result<(), TimelapseError> {
        self.calls
            .lock()
            .unwrap()
            .push((snapshot_dir.to_path_buf(), output.to_path_buf()));
        if let Some(log) = &self.log {
            log.record("assemble");
        }
        if self.fail {
            return Err(TimelapseError::assembly(output, "exit status 1"));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeNotifier {
    calls: Mutex<Vec<(String, Option<PathBuf>)>>,
    fail: bool,
    log: Option<EventLog>,
}

impl FakeNotifier {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn with_log(mut self, log: EventLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn calls(&self) -> Vec<(String, Option<PathBuf>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn notify(&self, body: &str, attachment: Option<&Path>) -> Result<(), TimelapseError> {
        self.calls
            .lock()
            .unwrap()
            .push((body.to_string(), attachment.map(Path::to_path_buf)));
        if let Some(log) = &self.log {
            log.record("notify");
        }
        if self.fail {
            return Err(TimelapseError::Notify("target refused".into()));
        }
        Ok(())
    }
}
