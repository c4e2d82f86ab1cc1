// crates/core/src/types.rs
//! Data model shared by the scheduler, the registry and the transport layer.

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
#[cfg(feature = "codegen")]
use ts_rs::TS;
use uuid::Uuid;

use crate::error::TimelapseError;

/// `remaining` value broadcast when a cancel request has been accepted.
pub const REMAINING_CANCELLING: i64 = -2;

/// `remaining` value broadcast when the tick chain has stopped after a cancel.
pub const REMAINING_CANCELLED: i64 = -1;

/// Opaque job identifier, assigned at submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimelapseId(Uuid);

impl TimelapseId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TimelapseId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TimelapseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for TimelapseId {
    type Err = TimelapseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| TimelapseError::not_found(s))
    }
}

/// Lifecycle of a job. `Cancelled` and `Completed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Active,
    Cancelling,
    Cancelled,
    Completed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Cancelled | JobStatus::Completed)
    }
}

/// Raw submit payload as it arrives from a client. Every field is optional
/// so missing parameters surface as validation errors rather than decode
/// failures.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimelapseRequest {
    pub url: Option<String>,
    pub interval: Option<f64>,
    pub frames: Option<i64>,
}

/// A submit payload that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    pub url: String,
    pub interval: Duration,
    pub frames: u32,
}

impl TimelapseRequest {
    pub fn validate(self) -> Result<ValidatedRequest, TimelapseError> {
        let url = self
            .url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .ok_or_else(|| TimelapseError::validation("url is required"))?;

        let interval = self
            .interval
            .ok_or_else(|| TimelapseError::validation("interval is required"))?;
        if !interval.is_finite() || interval <= 0.0 {
            return Err(TimelapseError::validation(format!(
                "interval must be a positive number of seconds, got {interval}"
            )));
        }

        let frames = self
            .frames
            .ok_or_else(|| TimelapseError::validation("frames is required"))?;
        let frames = u32::try_from(frames).map_err(|_| {
            TimelapseError::validation(format!("frames must be a non-negative integer, got {frames}"))
        })?;

        // Every deadline up to the last frame must be representable.
        let too_long = || {
            TimelapseError::validation(format!("interval of {interval} seconds is too long"))
        };
        let interval = Duration::try_from_secs_f64(interval).map_err(|_| too_long())?;
        if interval.is_zero() {
            return Err(TimelapseError::validation("interval is below clock resolution"));
        }
        interval
            .checked_mul(frames.max(1))
            .and_then(|span| Instant::now().checked_add(span))
            .ok_or_else(too_long)?;

        Ok(ValidatedRequest {
            url,
            interval,
            frames,
        })
    }
}

/// Immutable state report for one job, as pushed to progress subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "codegen", derive(TS), ts(export, export_to = "../../ui/src/generated/"))]
pub struct ProgressSnapshot {
    #[cfg_attr(feature = "codegen", ts(type = "string"))]
    pub timelapse_id: TimelapseId,
    pub rtsp_url_hash: String,
    /// Unix seconds.
    pub created: i64,
    /// Unix seconds.
    pub updated: i64,
    /// Seconds between captures.
    pub interval: f64,
    pub frames: u32,
    /// Frames still to capture, or one of the `REMAINING_*` sentinels.
    pub remaining: i64,
}

impl ProgressSnapshot {
    pub fn is_cancelling(&self) -> bool {
        self.remaining == REMAINING_CANCELLING
    }

    pub fn is_cancelled(&self) -> bool {
        self.remaining == REMAINING_CANCELLED
    }
}

/// Lowercase hex SHA-256 of a source URL. The plaintext URL never leaves the core.
pub fn hash_source_url(url: &str) -> String {
    hex::encode(Sha256::digest(url.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(url: Option<&str>, interval: Option<f64>, frames: Option<i64>) -> TimelapseRequest {
        TimelapseRequest {
            url: url.map(String::from),
            interval,
            frames,
        }
    }

    #[test]
    fn test_validate_accepts_well_formed_request() {
        let ok = request(Some(" rtsp://cam/stream1 "), Some(1.5), Some(120))
            .validate()
            .unwrap();
        assert_eq!(ok.url, "rtsp://cam/stream1");
        assert_eq!(ok.interval, Duration::from_millis(1500));
        assert_eq!(ok.frames, 120);
    }

    #[test]
    fn test_validate_allows_zero_frames() {
        let ok = request(Some("rtsp://x"), Some(1.0), Some(0)).validate().unwrap();
        assert_eq!(ok.frames, 0);
    }

    #[test]
    fn test_validate_rejects_missing_and_bad_fields() {
        let cases = [
            request(None, Some(1.0), Some(3)),
            request(Some("   "), Some(1.0), Some(3)),
            request(Some("rtsp://x"), None, Some(3)),
            request(Some("rtsp://x"), Some(0.0), Some(3)),
            request(Some("rtsp://x"), Some(-2.0), Some(3)),
            request(Some("rtsp://x"), Some(f64::NAN), Some(3)),
            request(Some("rtsp://x"), Some(1.0), None),
            request(Some("rtsp://x"), Some(1.0), Some(-1)),
            request(Some("rtsp://x"), Some(f64::INFINITY), Some(3)),
            request(Some("rtsp://x"), Some(1e-300), Some(3)),
        ];
        for case in cases {
            let err = case.clone().validate().unwrap_err();
            assert!(
                matches!(err, TimelapseError::Validation(_)),
                "expected validation error for {case:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn test_validate_rejects_unrepresentable_intervals() {
        // Beyond `Duration`.
        let err = request(Some("rtsp://x"), Some(1e20), Some(3)).validate().unwrap_err();
        assert!(matches!(err, TimelapseError::Validation(_)));

        // Fits a `Duration`, but the deadlines overflow the clock.
        let err = request(Some("rtsp://x"), Some(1.5e19), Some(3)).validate().unwrap_err();
        assert!(matches!(err, TimelapseError::Validation(_)));

        // Each interval fits on its own, but the last deadline does not.
        let err = request(Some("rtsp://x"), Some(1e18), Some(1000)).validate().unwrap_err();
        assert!(matches!(err, TimelapseError::Validation(_)));

        // A day between frames is fine.
        assert!(request(Some("rtsp://x"), Some(86_400.0), Some(365)).validate().is_ok());
    }

    #[test]
    fn test_hash_source_url_is_sha256_hex() {
        assert_eq!(
            hash_source_url("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_snapshot_json_shape() {
        let snap = ProgressSnapshot {
            timelapse_id: "6f1c1c1e-3b7e-4a53-9a4f-0b6f3e7e0a11".parse().unwrap(),
            rtsp_url_hash: hash_source_url("rtsp://x"),
            created: 1_700_000_000,
            updated: 1_700_000_010,
            interval: 10.0,
            frames: 120,
            remaining: REMAINING_CANCELLING,
        };
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["timelapse_id"], "6f1c1c1e-3b7e-4a53-9a4f-0b6f3e7e0a11");
        assert_eq!(json["remaining"], -2);
        assert_eq!(json["interval"], 10.0);
        assert!(json.get("url").is_none());
        assert!(snap.is_cancelling());
        assert!(!snap.is_cancelled());
    }

    #[test]
    fn test_timelapse_id_parse_rejects_garbage() {
        assert!("not-a-uuid".parse::<TimelapseId>().is_err());
        let id = TimelapseId::new();
        assert_eq!(id.to_string().parse::<TimelapseId>().unwrap(), id);
    }

    #[test]
    fn test_sentinels_match_ui_codes() {
        // The UI decodes -2 as "Cancelling..." and -1 as "Cancelled".
        assert_eq!(REMAINING_CANCELLING, -2);
        assert_eq!(REMAINING_CANCELLED, -1);
    }
}
