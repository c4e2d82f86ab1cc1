// crates/core/src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the timelapse core.
#[derive(Debug, Error)]
pub enum TimelapseError {
    /// Bad or missing submit parameters. Rejected before any scheduling.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Cancel (or lookup) of an id the registry does not hold.
    #[error("Timelapse not found: {0}")]
    NotFound(String),

    #[error("Frame capture into {path} failed: {message}")]
    Capture { path: PathBuf, message: String },

    #[error("Video assembly into {output} failed: {message}")]
    Assembly { output: PathBuf, message: String },

    #[error("Notification dispatch failed: {0}")]
    Notify(String),

    #[error("IO error accessing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl TimelapseError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(id: impl ToString) -> Self {
        Self::NotFound(id.to_string())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn capture(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Capture {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn assembly(output: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Assembly {
            output: output.into(),
            message: message.into(),
        }
    }
}
