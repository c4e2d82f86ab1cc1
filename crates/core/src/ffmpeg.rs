// crates/core/src/ffmpeg.rs
//! Shared process plumbing for the ffmpeg-backed capturer and assembler.

use std::ffi::OsStr;
use std::process::Stdio;

use tokio::process::Command as TokioCommand;

const STDERR_TAIL: usize = 500;

/// Run `program args..` to completion. On spawn failure or non-zero exit,
/// returns a message carrying the tail of stderr.
///
/// There is no timeout: a hung ffmpeg stalls its caller.
pub(crate) async fn run<I, S>(program: &str, args: I) -> Result<(), String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let t0 = std::time::Instant::now();
    let output = TokioCommand::new(program)
        .args(args)
        // Null stdin so ffmpeg never waits for the interactive `q`
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| format!("failed to spawn {program}: {e}"))?;

    if output.status.success() {
        tracing::debug!(program, elapsed_ms = t0.elapsed().as_millis() as u64, "ffmpeg finished");
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let tail = stderr_tail(&stderr);
    Err(format!("{program} exited with {}: {tail}", output.status))
}

fn stderr_tail(stderr: &str) -> &str {
    let trimmed = stderr.trim_end();
    if trimmed.len() <= STDERR_TAIL {
        return trimmed;
    }
    let mut start = trimmed.len() - STDERR_TAIL;
    while !trimmed.is_char_boundary(start) {
        start += 1;
    }
    &trimmed[start..]
}
