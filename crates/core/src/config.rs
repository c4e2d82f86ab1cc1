// crates/core/src/config.rs
//! Service configuration: notification targets and storage locations.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::TimelapseError;
use crate::types::TimelapseId;

pub const ENV_SNAPSHOT_ROOT: &str = "TIMELAPSE_SNAPSHOT_ROOT";
pub const ENV_OUTPUT_DIR: &str = "TIMELAPSE_OUTPUT_DIR";
pub const ENV_FFMPEG: &str = "TIMELAPSE_FFMPEG";

/// Configuration loaded from a JSON file, with environment overrides.
///
/// ```json
/// { "notifications": ["https://hooks.example.com/abc"] }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Webhook URLs that receive the finished video.
    pub notifications: Vec<String>,
    /// Parent of the per-job frame directories.
    pub snapshot_root: PathBuf,
    /// Where finished videos are written.
    pub output_dir: PathBuf,
    pub ffmpeg_path: String,
    /// Still send a notification (without attachment) when assembly failed.
    pub notify_on_assembly_failure: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            notifications: Vec::new(),
            snapshot_root: PathBuf::from("/tmp/snapshots"),
            output_dir: PathBuf::from("/data/timelapses"),
            ffmpeg_path: "ffmpeg".into(),
            notify_on_assembly_failure: false,
        }
    }
}

impl Config {
    /// Load from `path`, falling back to defaults when the file does not
    /// exist, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, TimelapseError> {
        let config = match std::fs::read_to_string(path) {
            Ok(raw) => Self::from_json(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "Config file not found, using defaults");
                Self::default()
            }
            Err(e) => return Err(TimelapseError::io(path, e)),
        };
        Ok(config.with_overrides(|key| std::env::var(key).ok()))
    }

    pub fn from_json(raw: &str) -> Result<Self, TimelapseError> {
        serde_json::from_str(raw).map_err(|e| TimelapseError::Config(e.to_string()))
    }

    /// Apply overrides from a key lookup (the process environment in production).
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = lookup(ENV_SNAPSHOT_ROOT).filter(|v| !v.is_empty()) {
            self.snapshot_root = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_OUTPUT_DIR).filter(|v| !v.is_empty()) {
            self.output_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_FFMPEG).filter(|v| !v.is_empty()) {
            self.ffmpeg_path = v;
        }
        self
    }

    /// Frame directory for one job: `<snapshot_root>/<id>`.
    pub fn snapshot_dir(&self, id: TimelapseId) -> PathBuf {
        self.snapshot_root.join(id.to_string())
    }

    /// Finished video for one job: `<output_dir>/<id>.mp4`.
    pub fn output_path(&self, id: TimelapseId) -> PathBuf {
        self.output_dir.join(format!("{id}.mp4"))
    }
}
