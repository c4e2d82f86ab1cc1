// crates/core/src/capture.rs
//! Frame capture invoker: grab one still frame from a live stream.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::TimelapseError;
use crate::ffmpeg;

/// Grabs a single still frame from `source` into `dest`.
///
/// Implementations are stateless and may be called concurrently for the
/// same job when a capture outlasts the interval.
#[async_trait]
pub trait FrameCapturer: Send + Sync {
    async fn capture(&self, source: &str, dest: &Path) -> Result<(), TimelapseError>;
}

/// File name of the `index`-th frame (1-based). Zero padded so that
/// lexical order equals capture order.
pub fn frame_file_name(index: u32) -> String {
    format!("{index:06}.png")
}

pub fn frame_path(snapshot_dir: &Path, index: u32) -> PathBuf {
    snapshot_dir.join(frame_file_name(index))
}

/// Runs `ffmpeg -i <source> -vframes 1 <dest>`.
#[derive(Debug, Clone)]
pub struct FfmpegCapturer {
    ffmpeg_path: String,
}

impl FfmpegCapturer {
    pub fn new(ffmpeg_path: impl Into<String>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }
}

impl Default for FfmpegCapturer {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[async_trait]
impl FrameCapturer for FfmpegCapturer {
    async fn capture(&self, source: &str, dest: &Path) -> Result<(), TimelapseError> {
        ffmpeg::run(
            &self.ffmpeg_path,
            [
                OsStr::new("-i"),
                OsStr::new(source),
                OsStr::new("-vframes"),
                OsStr::new("1"),
                dest.as_os_str(),
            ],
        )
        .await
        .map_err(|message| TimelapseError::capture(dest, message))?;

        tracing::info!(path = %dest.display(), "Frame saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_names_sort_in_capture_order() {
        let mut names: Vec<String> = [10, 2, 100, 1].into_iter().map(frame_file_name).collect();
        names.sort();
        assert_eq!(names, vec!["000001.png", "000002.png", "000010.png", "000100.png"]);
    }

    #[test]
    fn test_frame_path_joins_dir() {
        assert_eq!(
            frame_path(Path::new("/tmp/snapshots/x"), 7),
            PathBuf::from("/tmp/snapshots/x/000007.png")
        );
    }

    #[tokio::test]
    async fn test_missing_binary_is_capture_failure() {
        let capturer = FfmpegCapturer::new("definitely-not-ffmpeg-4242");
        let err = capturer
            .capture("rtsp://x", Path::new("/tmp/never.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, TimelapseError::Capture { .. }));
    }
}
