// crates/core/src/assemble.rs
//! Video assembler: combine a directory of ordered frames into one video.

use std::ffi::OsStr;
use std::path::Path;

use async_trait::async_trait;

use crate::error::TimelapseError;
use crate::ffmpeg;

/// Combines every frame in `snapshot_dir`, in file name order, into `output`.
#[async_trait]
pub trait VideoAssembler: Send + Sync {
    async fn assemble(&self, snapshot_dir: &Path, output: &Path) -> Result<(), TimelapseError>;
}

/// Runs `ffmpeg -pattern_type glob -i '<dir>/*.png' <output>`.
#[derive(Debug, Clone)]
pub struct FfmpegAssembler {
    ffmpeg_path: String,
}

impl FfmpegAssembler {
    pub fn new(ffmpeg_path: impl Into<String>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }
}

impl Default for FfmpegAssembler {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[async_trait]
impl VideoAssembler for FfmpegAssembler {
    async fn assemble(&self, snapshot_dir: &Path, output: &Path) -> Result<(), TimelapseError> {
        let pattern = snapshot_dir.join("*.png");
        tracing::info!(
            input = %pattern.display(),
            output = %output.display(),
            "Assembling timelapse video"
        );

        ffmpeg::run(
            &self.ffmpeg_path,
            [
                OsStr::new("-pattern_type"),
                OsStr::new("glob"),
                OsStr::new("-i"),
                pattern.as_os_str(),
                output.as_os_str(),
            ],
        )
        .await
        .map_err(|message| TimelapseError::assembly(output, message))
    }
}
