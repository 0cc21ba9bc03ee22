//! Child process helper shared by the yt-dlp and ffmpeg wrappers.

use std::ffi::OsStr;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use super::MediaError;

/// Longest stderr excerpt carried in a [`MediaError::ToolFailed`].
const STDERR_LIMIT: usize = 2048;

/// Run `program` to completion without blocking the runtime.
///
/// The child is killed if the returned future is dropped, so a connection
/// that goes away mid-download does not leave the process behind.
pub async fn run_tool<I, S>(program: &str, args: I) -> Result<(), MediaError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!(program, "Running external tool");

    let output = command.output().await.map_err(|source| MediaError::Spawn {
        program: program.to_string(),
        source,
    })?;

    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    let excerpt = match stderr.char_indices().nth(STDERR_LIMIT) {
        Some((cut, _)) => format!("{}...", &stderr[..cut]),
        None => stderr.to_string(),
    };

    Err(MediaError::ToolFailed {
        program: program.to_string(),
        status: output.status.to_string(),
        stderr: excerpt,
    })
}
