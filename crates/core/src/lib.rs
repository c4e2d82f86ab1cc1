// crates/core/src/lib.rs
//! Timelapse capture core: periodic frame capture from a live stream,
//! cooperative cancellation, and hand-off to video assembly and
//! notification once the target frame count is reached.
//!
//! Transport-agnostic: progress leaves through a [`ProgressSink`], and the
//! external tools sit behind [`FrameCapturer`], [`VideoAssembler`] and
//! [`Notifier`].

pub mod assemble;
pub mod capture;
pub mod config;
pub mod error;
mod ffmpeg;
pub mod finalize;
pub mod job;
pub mod notify;
pub mod progress;
pub mod registry;
pub mod scheduler;
pub mod service;
pub mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use assemble::{FfmpegAssembler, VideoAssembler};
pub use capture::{FfmpegCapturer, FrameCapturer};
pub use config::Config;
pub use error::*;
pub use finalize::{Finalize, FinalizeJob, Finalizer};
pub use job::{Tick, TimelapseJob};
pub use notify::{Notifier, WebhookNotifier};
pub use progress::{NoopSink, ProgressSink};
pub use registry::JobRegistry;
pub use scheduler::{CaptureScheduler, JobOutcome};
pub use service::{Submitted, TimelapseService};
pub use types::*;
