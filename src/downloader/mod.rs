//! Download step: fetch a selected stream to a local file

pub mod engine;
pub mod progress;

use crate::extractor::StreamDescriptor;
use crate::utils::error::{Result, TubeError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

// Re-export for convenience
pub use engine::{DownloadConfig, DownloadEngine};
pub use progress::{DisplayMode, Progress, ProgressEvent, ProgressRenderer};

/// Network transfer of remote bytes
#[async_trait]
pub trait ByteFetcher: Send + Sync {
    /// Stream `url` into `output_path`, reporting progress; returns bytes written
    async fn fetch_to_file(&self, url: &str, output_path: &Path, progress: &Progress) -> Result<u64>;

    /// Fetch a small resource into memory. `Ok(None)` unless the server answers 200.
    async fn fetch_bytes(&self, url: &str) -> Result<Option<Vec<u8>>>;
}

/// A chosen stream and where it should land on disk
#[derive(Debug, Clone)]
pub struct DownloadJob {
    pub stream: StreamDescriptor,
    pub local_path: PathBuf,
}

impl DownloadJob {
    pub fn new(stream: &StreamDescriptor, local_path: impl Into<PathBuf>) -> Self {
        Self {
            stream: stream.clone(),
            local_path: local_path.into(),
        }
    }
}

/// Run a download job once. Fetcher failures surface as `FetchFailed`; a
/// partially written file is removed.
pub async fn download(
    fetcher: &dyn ByteFetcher,
    job: DownloadJob,
    progress: &Progress,
) -> Result<PathBuf> {
    debug!(
        "Downloading format {} to {}",
        job.stream.format_id,
        job.local_path.display()
    );

    match fetcher
        .fetch_to_file(&job.stream.locator, &job.local_path, progress)
        .await
    {
        Ok(_) => Ok(job.local_path),
        Err(e) => {
            if job.local_path.exists() {
                if let Err(rm) = tokio::fs::remove_file(&job.local_path).await {
                    warn!(
                        "Failed to remove partial download {}: {}",
                        job.local_path.display(),
                        rm
                    );
                }
            }
            Err(match e {
                TubeError::FetchFailed(msg) => TubeError::FetchFailed(msg),
                other => TubeError::FetchFailed(other.to_string()),
            })
        }
    }
}
