//! Per-item pipeline: resolve, assemble, tag, classify

use crate::batch::BatchContext;
use crate::downloader::{ByteFetcher, Progress};
use crate::extractor::{PlaylistEntry, ResolvedVideo, SourceResolver};
use crate::media::{MediaTranscoder, TagWriter};
use crate::pipeline::assemble::{AssembledAsset, Assembler, Assembly};
use crate::pipeline::tagging::tag_asset;
use crate::utils::config::RunConfig;
use crate::utils::error::{RestrictionKind, Result, TubeError};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// External collaborators the pipeline drives
#[derive(Clone)]
pub struct Toolset {
    pub resolver: Arc<dyn SourceResolver>,
    pub fetcher: Arc<dyn ByteFetcher>,
    pub transcoder: Arc<dyn MediaTranscoder>,
    pub tag_writer: Arc<dyn TagWriter>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Restricted(RestrictionKind),
    /// Every requested output was already present
    Existing(PathBuf),
}

#[derive(Debug)]
pub enum ItemOutcome {
    Completed { outputs: Vec<AssembledAsset> },
    Skipped(SkipReason),
    Failed(TubeError),
}

/// Flat projection of [`ItemOutcome`] for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemStatus {
    Completed,
    SkippedRestricted,
    SkippedExisting,
    Failed,
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ItemStatus::Completed => "completed",
            ItemStatus::SkippedRestricted => "skipped (restricted)",
            ItemStatus::SkippedExisting => "skipped (exists)",
            ItemStatus::Failed => "failed",
        };
        f.write_str(label)
    }
}

#[derive(Debug)]
pub struct ItemResult {
    pub index: usize,
    pub title: String,
    pub outcome: ItemOutcome,
}

impl ItemResult {
    pub fn status(&self) -> ItemStatus {
        match &self.outcome {
            ItemOutcome::Completed { .. } => ItemStatus::Completed,
            ItemOutcome::Skipped(SkipReason::Restricted(_)) => ItemStatus::SkippedRestricted,
            ItemOutcome::Skipped(SkipReason::Existing(_)) => ItemStatus::SkippedExisting,
            ItemOutcome::Failed(_) => ItemStatus::Failed,
        }
    }
}

/// Turns one entry into an [`ItemResult`]. Errors never escape; the only way
/// out early is the caller dropping the future.
pub struct ItemPipeline<'a> {
    tools: &'a Toolset,
    config: &'a RunConfig,
    progress: &'a Progress,
}

impl<'a> ItemPipeline<'a> {
    pub fn new(tools: &'a Toolset, config: &'a RunConfig, progress: &'a Progress) -> Self {
        Self {
            tools,
            config,
            progress,
        }
    }

    pub async fn process(&self, index: usize, entry: &PlaylistEntry, ctx: &BatchContext) -> ItemResult {
        if entry.url.is_empty() {
            let missing = TubeError::ExtractionFailed("playlist entry has no url".to_string());
            return self.finish(index, entry.display_title().to_string(), Err(missing));
        }
        let video = match self.tools.resolver.resolve(&entry.url).await {
            Ok(video) => video,
            Err(e) => {
                return self.finish(index, entry.display_title().to_string(), Err(e));
            }
        };
        let title = video.descriptor.title.clone();
        self.progress.narrate(format!("Title: {}", title));

        let outcome = self.assemble(index, &video, ctx).await;
        self.finish(index, title, outcome)
    }

    async fn assemble(
        &self,
        index: usize,
        video: &ResolvedVideo,
        ctx: &BatchContext,
    ) -> Result<ItemOutcome> {
        let mut assembler = Assembler::new(
            self.tools.fetcher.as_ref(),
            self.tools.transcoder.as_ref(),
            self.config,
            self.progress,
        );
        let mut outputs = Vec::new();
        let mut existing = None;

        if self.config.target.wants_video() {
            match assembler.assemble_video(video, &ctx.output_dir).await? {
                Assembly::Produced(asset) => outputs.push(asset),
                Assembly::Existing(path) => existing = Some(path),
            }
        }

        if self.config.target.wants_audio() {
            let prefix = ctx.prefix_for(index);
            match assembler
                .assemble_audio(video, &ctx.output_dir, prefix.as_deref())
                .await?
            {
                Assembly::Produced(staged) => {
                    if self.config.tagging_enabled() {
                        tag_asset(
                            self.tools.tag_writer.as_ref(),
                            self.tools.fetcher.as_ref(),
                            staged.path(),
                            &video.descriptor,
                            &self.config.overrides,
                            self.progress,
                        )
                        .await?;
                    }
                    // final name only once the tags are in
                    outputs.push(staged.commit().await?);
                }
                Assembly::Existing(path) => existing = existing.or(Some(path)),
            }
        }

        Ok(match (outputs.is_empty(), existing) {
            (true, Some(path)) => ItemOutcome::Skipped(SkipReason::Existing(path)),
            _ => ItemOutcome::Completed { outputs },
        })
    }

    fn finish(&self, index: usize, title: String, outcome: Result<ItemOutcome>) -> ItemResult {
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => match e.restriction() {
                Some(kind) => ItemOutcome::Skipped(SkipReason::Restricted(kind)),
                None => ItemOutcome::Failed(e),
            },
        };

        match &outcome {
            ItemOutcome::Completed { outputs } => {
                info!("[{}] {} completed ({} file(s))", index, title, outputs.len())
            }
            ItemOutcome::Skipped(SkipReason::Restricted(kind)) => {
                warn!("[{}] {} skipped: content is {}", index, title, kind);
                self.progress
                    .narrate(format!("Skipping {}: content is {}", title, kind));
            }
            ItemOutcome::Skipped(SkipReason::Existing(path)) => {
                info!("[{}] {} skipped: {} exists", index, title, path.display())
            }
            ItemOutcome::Failed(e) => {
                warn!("[{}] {} failed: {}", index, title, e);
                self.progress.narrate(format!("Failed {}: {}", title, e));
            }
        }

        ItemResult {
            index,
            title,
            outcome,
        }
    }
}
