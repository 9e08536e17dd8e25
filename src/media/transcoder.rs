//! ffmpeg-backed media transcoder

use crate::media::run_ffmpeg;
use crate::utils::error::{Result, TubeError};
use async_trait::async_trait;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Encoder speed/quality trade-off, ordered fastest to slowest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CompressionPreset {
    Ultrafast,
    Superfast,
    Veryfast,
    Faster,
    Fast,
    Medium,
    Slow,
    Slower,
    Veryslow,
    Placebo,
}

impl CompressionPreset {
    pub const ALL: [CompressionPreset; 10] = [
        CompressionPreset::Ultrafast,
        CompressionPreset::Superfast,
        CompressionPreset::Veryfast,
        CompressionPreset::Faster,
        CompressionPreset::Fast,
        CompressionPreset::Medium,
        CompressionPreset::Slow,
        CompressionPreset::Slower,
        CompressionPreset::Veryslow,
        CompressionPreset::Placebo,
    ];

    /// Map a compression level (0-9) onto a preset; the level is the index
    pub fn from_level(level: i64) -> Result<Self> {
        let preset = usize::try_from(level)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied());
        preset.ok_or_else(|| {
            TubeError::InvalidConfiguration(format!(
                "Invalid compress level ({}). Use --help for more information.",
                level
            ))
        })
    }

    /// The x264 preset name
    pub fn as_str(self) -> &'static str {
        match self {
            CompressionPreset::Ultrafast => "ultrafast",
            CompressionPreset::Superfast => "superfast",
            CompressionPreset::Veryfast => "veryfast",
            CompressionPreset::Faster => "faster",
            CompressionPreset::Fast => "fast",
            CompressionPreset::Medium => "medium",
            CompressionPreset::Slow => "slow",
            CompressionPreset::Slower => "slower",
            CompressionPreset::Veryslow => "veryslow",
            CompressionPreset::Placebo => "placebo",
        }
    }
}

impl fmt::Display for CompressionPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encoding settings for an audio+video merge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeSettings {
    pub preset: CompressionPreset,
    pub threads: usize,
}

/// Produces re-encoded or merged media files
#[async_trait]
pub trait MediaTranscoder: Send + Sync {
    /// Re-encode any audio input into an MP3 file
    async fn transcode_audio(&self, input: &Path, output: &Path) -> Result<()>;

    /// Combine a video-only and an audio-only input into one container
    async fn merge(
        &self,
        video: &Path,
        audio: &Path,
        output: &Path,
        settings: MergeSettings,
    ) -> Result<()>;
}

/// Transcoder driving the ffmpeg executable
pub struct FfmpegTranscoder {
    ffmpeg_path: PathBuf,
}

impl FfmpegTranscoder {
    pub fn new(ffmpeg_path: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }

    pub fn ffmpeg_path(&self) -> &Path {
        &self.ffmpeg_path
    }
}

/// Arguments for the MP3 transcode: 44.1 kHz stereo, 32-bit planar samples
pub fn audio_args(input: &Path, output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-i".into(), input.into()];
    args.extend(
        [
            "-vn",
            "-c:a",
            "libmp3lame",
            "-ar",
            "44100",
            "-ac",
            "2",
            "-sample_fmt",
            "s32p",
            "-q:a",
            "2",
        ]
        .map(OsString::from),
    );
    args.push(output.into());
    args
}

/// Arguments for the merge: video re-encoded with x264 at the given preset
pub fn merge_args(video: &Path, audio: &Path, output: &Path, settings: MergeSettings) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "-i".into(),
        video.into(),
        "-i".into(),
        audio.into(),
    ];
    args.extend(
        ["-map", "0:v:0", "-map", "1:a:0", "-c:v", "libx264", "-preset"].map(OsString::from),
    );
    args.push(settings.preset.as_str().into());
    args.push("-threads".into());
    args.push(settings.threads.to_string().into());
    args.extend(["-c:a", "aac", "-b:a", "192k", "-movflags", "+faststart"].map(OsString::from));
    args.push(output.into());
    args
}

async fn remove_partial(output: &Path) {
    if output.exists() {
        let _ = tokio::fs::remove_file(output).await;
    }
}

#[async_trait]
impl MediaTranscoder for FfmpegTranscoder {
    async fn transcode_audio(&self, input: &Path, output: &Path) -> Result<()> {
        debug!("Transcoding {} to {}", input.display(), output.display());
        let result = run_ffmpeg(&self.ffmpeg_path, audio_args(input, output)).await;
        if let Err(e) = result {
            remove_partial(output).await;
            return Err(TubeError::TranscodeFailed(e));
        }
        info!("Transcoded {}", output.display());
        Ok(())
    }

    async fn merge(
        &self,
        video: &Path,
        audio: &Path,
        output: &Path,
        settings: MergeSettings,
    ) -> Result<()> {
        debug!(
            "Merging {} + {} with preset {} on {} threads",
            video.display(),
            audio.display(),
            settings.preset,
            settings.threads
        );
        let result = run_ffmpeg(&self.ffmpeg_path, merge_args(video, audio, output, settings)).await;
        if let Err(e) = result {
            remove_partial(output).await;
            return Err(TubeError::TranscodeFailed(e));
        }
        info!("Merged {}", output.display());
        Ok(())
    }
}
