//! Tubeloader - command line video and audio downloader
//!
//! Resolves streams with yt-dlp, downloads them with a streaming HTTP engine
//! and assembles, converts and tags the results with ffmpeg.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tubeloader::batch::{BatchOrchestrator, BatchSource, StdinConfirm};
use tubeloader::downloader::{DisplayMode, DownloadConfig, DownloadEngine, Progress, ProgressRenderer};
use tubeloader::media::{FfmpegTagWriter, FfmpegTranscoder};
use tubeloader::pipeline::Toolset;
use tubeloader::utils::config::{default_threads, DEFAULT_COMPRESS_LEVEL, DEFAULT_MAX_RESOLUTION};
use tubeloader::utils::{tools, RunConfig, TagOverrides, TargetFormat, TubeError};
use tubeloader::YtDlpResolver;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "tubeloader", version, about = "Download videos and audio from YouTube")]
struct Args {
    /// One or more video URLs
    #[arg(short, long = "url", num_args = 1.., required_unless_present = "playlist", conflicts_with = "playlist")]
    urls: Vec<String>,

    /// Playlist URL; every entry is downloaded into playlist-<title>/
    #[arg(short, long)]
    playlist: Option<String>,

    /// What to produce
    #[arg(short, long, value_enum, default_value_t = TargetFormat::Audio)]
    format: TargetFormat,

    /// Highest video resolution to download
    #[arg(short, long, default_value_t = DEFAULT_MAX_RESOLUTION)]
    max_resolution: u32,

    /// Merge separate video and audio streams instead of using a progressive stream
    #[arg(short, long)]
    development: bool,

    /// Apply --max-resolution to progressive streams too
    #[arg(long)]
    cap_progressive: bool,

    /// Encoder threads for merging
    #[arg(short, long, default_value_t = default_threads())]
    threads: usize,

    /// x264 preset for merging, 0 (ultrafast) to 9 (placebo)
    #[arg(long, default_value_t = DEFAULT_COMPRESS_LEVEL, allow_negative_numbers = true)]
    compress_level: i64,

    /// Do not write tags into audio files
    #[arg(long)]
    exclude_metadata: bool,

    /// Artist tag override
    #[arg(long)]
    artist: Option<String>,

    /// Album tag override
    #[arg(long)]
    album: Option<String>,

    /// Title tag override
    #[arg(long)]
    title: Option<String>,

    /// Show one bar ticking per item even for a single URL
    #[arg(long)]
    single_progress_bar: bool,

    /// Suppress narration and the summary
    #[arg(short, long)]
    silent: bool,

    /// Directory outputs are written to
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Path to the yt-dlp executable
    #[arg(long = "yt-dlp")]
    yt_dlp: Option<PathBuf>,

    /// Path to the ffmpeg executable
    #[arg(long)]
    ffmpeg: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn run_config(&self) -> RunConfig {
        RunConfig {
            target: self.format,
            max_resolution: self.max_resolution,
            development: self.development,
            cap_progressive: self.cap_progressive,
            compress_level: self.compress_level,
            threads: self.threads,
            add_metadata: !self.exclude_metadata,
            overrides: TagOverrides {
                artist: self.artist.clone(),
                title: self.title.clone(),
                album: self.album.clone(),
            },
            single_progress_bar: self.single_progress_bar,
            silent: self.silent,
            output_dir: self.output_dir.clone(),
        }
    }

    fn source(&self) -> BatchSource {
        match &self.playlist {
            Some(url) => BatchSource::Playlist(url.clone()),
            None => BatchSource::Urls(self.urls.clone()),
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .without_time()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let code = match runtime.block_on(run(args)) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    };
    // a prompt cancelled mid-read still has a thread blocked on stdin
    runtime.shutdown_timeout(Duration::from_millis(250));
    code
}

/// Returns whether every item finished without failing
async fn run(args: Args) -> Result<bool> {
    let config = args.run_config();
    config.validate()?;

    let ytdlp = tools::locate("yt-dlp", args.yt_dlp.as_deref())?;
    let ffmpeg = tools::locate("ffmpeg", args.ffmpeg.as_deref())?;

    let fetcher = Arc::new(DownloadEngine::new(DownloadConfig::default())?);
    let toolset = Toolset {
        resolver: Arc::new(YtDlpResolver::new(ytdlp)),
        fetcher,
        transcoder: Arc::new(FfmpegTranscoder::new(ffmpeg.clone())),
        tag_writer: Arc::new(FfmpegTagWriter::new(ffmpeg)),
    };

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, cancelling");
                cancel.cancel();
            }
        });
    }

    let orchestrator = BatchOrchestrator::new(toolset, &config, Arc::new(StdinConfirm));
    let batch = match orchestrator.prepare(args.source(), cancel.clone()).await {
        Ok(batch) => batch,
        Err(TubeError::UserCancelled) => {
            eprintln!("Download has been cancelled");
            return Ok(false);
        }
        Err(e) => return Err(e.into()),
    };

    let mode = DisplayMode::choose(batch.len(), config.silent, config.single_progress_bar);
    let (progress, rx) = Progress::channel();
    let renderer = ProgressRenderer::new(mode).spawn(rx);

    let outcome = orchestrator.run(&batch, &progress).await;
    drop(progress);
    let _ = renderer.await;

    let report = match outcome {
        Ok(report) => report,
        Err(TubeError::UserCancelled) => {
            eprintln!("Download has been cancelled");
            return Ok(false);
        }
        Err(e) => return Err(e.into()),
    };

    if !config.silent {
        if let Some(title) = &batch.playlist_title {
            println!("Playlist: {}", title);
        }
        println!("{}", report);
    }

    Ok(!report.has_failures())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_compress_level_reaches_validation() {
        for level in ["-1", "300"] {
            let args = Args::try_parse_from(["tubeloader", "-u", "https://youtu.be/x", "--compress-level", level])
                .unwrap();
            let err = args.run_config().validate().unwrap_err();

            assert!(matches!(err, TubeError::InvalidConfiguration(_)));
            assert!(err.to_string().contains(level));
        }
    }

    #[test]
    fn test_default_compress_level_is_valid() {
        let args = Args::try_parse_from(["tubeloader", "-u", "https://youtu.be/x"]).unwrap();

        assert_eq!(args.compress_level, DEFAULT_COMPRESS_LEVEL);
        assert!(args.run_config().validate().is_ok());
    }
}
