//! Sequential batch runner over single URLs or a playlist

use crate::batch::playlist_dir::{prepare_playlist_dir, Confirm};
use crate::downloader::{Progress, ProgressEvent};
use crate::extractor::PlaylistEntry;
use crate::pipeline::item::{ItemPipeline, ItemResult, ItemStatus, Toolset};
use crate::utils::config::RunConfig;
use crate::utils::error::{Result, TubeError};
use crate::utils::organizer::{playlist_dir_name, positional_prefix};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// What the user asked to download
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchSource {
    Urls(Vec<String>),
    Playlist(String),
}

/// Shared by every item in a batch
#[derive(Debug, Clone)]
pub struct BatchContext {
    pub output_dir: PathBuf,
    /// Playlist runs prefix audio files with the entry's position
    pub numbered: bool,
    pub cancel: CancellationToken,
}

impl BatchContext {
    pub fn prefix_for(&self, index: usize) -> Option<String> {
        self.numbered.then(|| positional_prefix(index))
    }
}

/// Entries resolved and an output directory ready, nothing downloaded yet
#[derive(Debug)]
pub struct PreparedBatch {
    pub playlist_title: Option<String>,
    pub entries: Vec<PlaylistEntry>,
    pub context: BatchContext,
}

impl PreparedBatch {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Per-item results in input order
#[derive(Debug, Default)]
pub struct BatchReport {
    pub results: Vec<ItemResult>,
}

impl BatchReport {
    pub fn count(&self, status: ItemStatus) -> usize {
        self.results.iter().filter(|r| r.status() == status).count()
    }

    pub fn statuses(&self) -> Vec<ItemStatus> {
        self.results.iter().map(ItemResult::status).collect()
    }

    pub fn has_failures(&self) -> bool {
        self.count(ItemStatus::Failed) > 0
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} completed, {} skipped (restricted), {} skipped (exists), {} failed",
            self.count(ItemStatus::Completed),
            self.count(ItemStatus::SkippedRestricted),
            self.count(ItemStatus::SkippedExisting),
            self.count(ItemStatus::Failed)
        )
    }
}

pub struct BatchOrchestrator<'a> {
    tools: Toolset,
    config: &'a RunConfig,
    confirm: Arc<dyn Confirm>,
}

impl<'a> BatchOrchestrator<'a> {
    pub fn new(tools: Toolset, config: &'a RunConfig, confirm: Arc<dyn Confirm>) -> Self {
        Self {
            tools,
            config,
            confirm,
        }
    }

    /// Resolve the entry list and set up the output directory.
    ///
    /// A playlist that cannot be resolved fails the whole run.
    pub async fn prepare(&self, source: BatchSource, cancel: CancellationToken) -> Result<PreparedBatch> {
        match source {
            BatchSource::Urls(urls) => {
                tokio::fs::create_dir_all(&self.config.output_dir).await?;
                Ok(PreparedBatch {
                    playlist_title: None,
                    entries: urls.into_iter().map(PlaylistEntry::from_url).collect(),
                    context: BatchContext {
                        output_dir: self.config.output_dir.clone(),
                        numbered: false,
                        cancel,
                    },
                })
            }
            BatchSource::Playlist(url) => {
                let resolved = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(TubeError::UserCancelled),
                    resolved = self.tools.resolver.resolve_playlist(&url) => resolved,
                };
                let playlist = resolved.map_err(|e| match e {
                    TubeError::ExtractionFailed(msg) => TubeError::ExtractionFailed(msg),
                    other => TubeError::ExtractionFailed(other.to_string()),
                })?;
                info!(
                    "Playlist '{}' has {} entries",
                    playlist.title,
                    playlist.entries.len()
                );

                let output_dir = self.config.output_dir.join(playlist_dir_name(&playlist.title));
                prepare_playlist_dir(&output_dir, self.confirm.as_ref(), &cancel).await?;

                Ok(PreparedBatch {
                    playlist_title: Some(playlist.title),
                    entries: playlist.entries,
                    context: BatchContext {
                        output_dir,
                        numbered: true,
                        cancel,
                    },
                })
            }
        }
    }

    /// Process every entry in order, one at a time.
    ///
    /// Cancellation drops the in-flight item, which releases its scratch
    /// files, and surfaces as `UserCancelled`.
    pub async fn run(&self, batch: &PreparedBatch, progress: &Progress) -> Result<BatchReport> {
        let pipeline = ItemPipeline::new(&self.tools, self.config, progress);
        let ctx = &batch.context;
        let total = batch.len();
        let mut report = BatchReport::default();

        for (index, entry) in batch.entries.iter().enumerate() {
            if ctx.cancel.is_cancelled() {
                return Err(TubeError::UserCancelled);
            }

            progress.send(ProgressEvent::ItemStarted {
                index,
                total,
                title: entry.display_title().to_string(),
            });

            let result = tokio::select! {
                biased;
                _ = ctx.cancel.cancelled() => {
                    warn!("Cancelled during item {} of {}", index + 1, total);
                    return Err(TubeError::UserCancelled);
                }
                result = pipeline.process(index, entry, ctx) => result,
            };

            progress.send(ProgressEvent::ItemFinished);
            report.results.push(result);
        }

        info!("Batch finished: {}", report);
        Ok(report)
    }
}
