//! Tagging step: resolve tag fields by precedence and commit them once

use crate::downloader::{ByteFetcher, Progress};
use crate::extractor::models::{META_ALBUM, META_ARTIST, META_SONG};
use crate::extractor::VideoDescriptor;
use crate::media::{TagSet, TagWriter};
use crate::utils::config::TagOverrides;
use crate::utils::error::Result;
use std::path::Path;
use tracing::{debug, warn};

/// Resolve each text field: explicit override, then provider metadata, then
/// the video's own author/title. Cover art is fetched separately.
pub fn resolve_tags(video: &VideoDescriptor, overrides: &TagOverrides) -> TagSet {
    let pick = |explicit: &Option<String>, key: &str, fallback: &str| {
        explicit
            .clone()
            .or_else(|| video.provider_metadata.get(key).cloned())
            .unwrap_or_else(|| fallback.to_string())
    };

    TagSet {
        artist: Some(pick(&overrides.artist, META_ARTIST, &video.author)),
        title: Some(pick(&overrides.title, META_SONG, &video.title)),
        album: Some(pick(&overrides.album, META_ALBUM, &video.title)),
        cover: None,
    }
}

/// Cover bytes, or `None` if there is no thumbnail or fetching it failed
pub async fn fetch_cover(fetcher: &dyn ByteFetcher, video: &VideoDescriptor) -> Option<Vec<u8>> {
    let locator = video.thumbnail.as_deref()?;
    match fetcher.fetch_bytes(locator).await {
        Ok(Some(bytes)) => Some(bytes),
        Ok(None) => {
            debug!("Thumbnail not available for {}", video.id);
            None
        }
        Err(e) => {
            warn!("Failed to download thumbnail for {}: {}", video.id, e);
            None
        }
    }
}

/// Resolve, fetch cover art and write everything in one save
pub async fn tag_asset(
    writer: &dyn TagWriter,
    fetcher: &dyn ByteFetcher,
    asset: &Path,
    video: &VideoDescriptor,
    overrides: &TagOverrides,
    progress: &Progress,
) -> Result<TagSet> {
    let mut tags = resolve_tags(video, overrides);
    progress.narrate("Metadata:");
    for (key, value) in [
        ("Artist", &tags.artist),
        ("Song", &tags.title),
        ("Album", &tags.album),
    ] {
        if let Some(value) = value {
            progress.narrate(format!("{}: {}", key, value));
        }
    }

    progress.narrate("Downloading thumbnail...");
    tags.cover = fetch_cover(fetcher, video).await;
    if tags.cover.is_some() {
        progress.narrate("Thumbnail has been set.");
    }

    writer.write_tags(asset, &tags).await?;
    Ok(tags)
}
