//! External media tooling: transcoding/merging and tag writing

pub mod tag_writer;
pub mod transcoder;

pub use tag_writer::{FfmpegTagWriter, TagSet, TagWriter};
pub use transcoder::{CompressionPreset, FfmpegTranscoder, MediaTranscoder, MergeSettings};

use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command as AsyncCommand;
use tracing::{debug, error};

/// Run ffmpeg to completion; the error carries its stderr.
///
/// The child is killed if the returned future is dropped, so a cancelled
/// pipeline never leaves an encoder running.
pub(crate) async fn run_ffmpeg(ffmpeg: &Path, args: Vec<OsString>) -> Result<(), String> {
    debug!("ffmpeg {:?}", args);

    let output = AsyncCommand::new(ffmpeg)
        .args(["-hide_banner", "-loglevel", "error", "-nostdin", "-y"])
        .args(&args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| format!("failed to start {}: {}", ffmpeg.display(), e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        error!("ffmpeg exited with {}: {}", output.status, stderr.trim());
        return Err(format!("ffmpeg exited with {}: {}", output.status, stderr.trim()));
    }

    Ok(())
}
