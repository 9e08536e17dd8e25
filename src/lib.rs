//! Tubeloader library

pub mod batch;
pub mod downloader;
pub mod extractor;
pub mod media;
pub mod pipeline;
pub mod utils;

// Re-export main types for easier use
pub use batch::{BatchOrchestrator, BatchReport, BatchSource, StdinConfirm};
pub use downloader::{DisplayMode, DownloadConfig, DownloadEngine, Progress, ProgressRenderer};
pub use extractor::{ResolvedVideo, SourceResolver, StreamDescriptor, YtDlpResolver};
pub use media::{FfmpegTagWriter, FfmpegTranscoder};
pub use pipeline::{ItemOutcome, ItemResult, ItemStatus, Toolset};
pub use utils::{RunConfig, TargetFormat, TubeError};
