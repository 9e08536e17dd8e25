//! yt-dlp wrapper for video extraction
//!
//! Stream discovery is delegated to `yt-dlp --dump-json`; the selected
//! streams are then fetched directly by the download engine.

use crate::extractor::models::{
    PlaylistEntry, PlaylistInfo, ResolvedVideo, YtDlpPlaylist, YtDlpVideo,
};
use crate::extractor::traits::SourceResolver;
use crate::utils::error::{RestrictionKind, Result, TubeError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command as AsyncCommand;
use tracing::{debug, error};

/// Source resolver backed by the yt-dlp executable
pub struct YtDlpResolver {
    ytdlp_path: PathBuf,
}

impl YtDlpResolver {
    /// Initialize with an already located yt-dlp binary
    pub fn new(ytdlp_path: impl Into<PathBuf>) -> Self {
        Self {
            ytdlp_path: ytdlp_path.into(),
        }
    }

    /// Get the path to yt-dlp being used
    pub fn ytdlp_path(&self) -> &Path {
        &self.ytdlp_path
    }

    async fn run(&self, args: &[&str], url: &str) -> Result<String> {
        let output = AsyncCommand::new(&self.ytdlp_path)
            .args(args)
            .arg("--no-warnings")
            .arg(url)
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            let error_msg = String::from_utf8_lossy(&output.stderr);
            error!("yt-dlp failed for {}: {}", url, error_msg.trim());
            return Err(classify_ytdlp_error(&error_msg));
        }

        String::from_utf8(output.stdout)
            .map_err(|e| TubeError::ExtractionFailed(format!("non UTF-8 output: {}", e)))
    }
}

#[async_trait]
impl SourceResolver for YtDlpResolver {
    fn id(&self) -> &'static str {
        "ytdlp"
    }

    /// Uses: yt-dlp --dump-json --no-download --no-playlist
    async fn resolve(&self, url: &str) -> Result<ResolvedVideo> {
        debug!("Extracting video info for URL: {}", url);
        let json_str = self
            .run(&["--dump-json", "--no-download", "--no-playlist"], url)
            .await?;
        let raw: YtDlpVideo = serde_json::from_str(json_str.trim())?;
        Ok(raw.into())
    }

    /// Uses: yt-dlp --flat-playlist --dump-single-json
    async fn resolve_playlist(&self, url: &str) -> Result<PlaylistInfo> {
        debug!("Extracting playlist info for URL: {}", url);
        let json_str = self
            .run(&["--flat-playlist", "--dump-single-json"], url)
            .await?;
        let raw: YtDlpPlaylist = serde_json::from_str(json_str.trim())?;
        Ok(playlist_from_raw(raw))
    }
}

/// Entries keep their playlist positions; one yt-dlp could not give a
/// locator for gets an empty url and fails on its own later.
fn playlist_from_raw(raw: YtDlpPlaylist) -> PlaylistInfo {
    let entries = raw
        .entries
        .into_iter()
        .map(|entry| {
            let url = entry
                .url
                .or_else(|| {
                    entry
                        .id
                        .map(|id| format!("https://www.youtube.com/watch?v={}", id))
                })
                .unwrap_or_default();
            PlaylistEntry {
                url,
                title: entry.title,
            }
        })
        .collect();

    PlaylistInfo {
        title: raw.title.unwrap_or_else(|| "untitled".to_string()),
        entries,
    }
}

/// Map yt-dlp's stderr onto the pipeline's error taxonomy
pub fn classify_ytdlp_error(stderr: &str) -> TubeError {
    let lower = stderr.to_lowercase();
    if lower.contains("members-only") || lower.contains("join this channel") {
        TubeError::RestrictedContent(RestrictionKind::MembersOnly)
    } else if lower.contains("confirm your age")
        || lower.contains("age-restricted")
        || lower.contains("inappropriate for some users")
    {
        TubeError::RestrictedContent(RestrictionKind::AgeRestricted)
    } else if lower.contains("unable to extract") || lower.contains("unsupported url") {
        TubeError::RestrictedContent(RestrictionKind::Unextractable)
    } else {
        TubeError::ExtractionFailed(stderr.trim().to_string())
    }
}

// ============================================================
// Tests
// ============================================================
