//! Embedding descriptive tags and cover art into audio files

use crate::media::run_ffmpeg;
use crate::utils::error::{Result, TubeError};
use async_trait::async_trait;
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tracing::{debug, info};

/// Fully resolved tag values for one audio file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet {
    pub artist: Option<String>,
    pub title: Option<String>,
    pub album: Option<String>,
    pub cover: Option<Vec<u8>>,
}

/// Writes a [`TagSet`] into a file's container metadata in one save
#[async_trait]
pub trait TagWriter: Send + Sync {
    async fn write_tags(&self, path: &Path, tags: &TagSet) -> Result<()>;
}

/// Tag writer that remuxes through ffmpeg (`-c copy`, ID3v2.3) into a sibling
/// file and renames it over the original
pub struct FfmpegTagWriter {
    ffmpeg_path: PathBuf,
}

impl FfmpegTagWriter {
    pub fn new(ffmpeg_path: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }
}

/// Sibling path ffmpeg writes to before the rename
pub fn staging_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{}.tagging.mp3", stem))
}

pub fn tag_args(input: &Path, cover: Option<&Path>, tags: &TagSet, output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-i".into(), input.into()];
    if let Some(cover) = cover {
        args.push("-i".into());
        args.push(cover.into());
    }
    args.extend(["-map", "0:a"].map(OsString::from));
    if cover.is_some() {
        args.extend(["-map", "1:0"].map(OsString::from));
    }
    // ID3v2.3 is what most players read cover art from
    args.extend(["-c", "copy", "-id3v2_version", "3"].map(OsString::from));

    for (key, value) in [
        ("artist", &tags.artist),
        ("title", &tags.title),
        ("album", &tags.album),
    ] {
        if let Some(value) = value {
            args.push("-metadata".into());
            args.push(format!("{}={}", key, value).into());
        }
    }
    if cover.is_some() {
        args.extend(
            [
                "-metadata:s:v",
                "title=Album cover",
                "-metadata:s:v",
                "comment=Cover (front)",
            ]
            .map(OsString::from),
        );
    }
    args.push(output.into());
    args
}

#[async_trait]
impl TagWriter for FfmpegTagWriter {
    async fn write_tags(&self, path: &Path, tags: &TagSet) -> Result<()> {
        let failed = |reason: String| TubeError::TaggingFailed {
            path: path.to_path_buf(),
            reason,
        };

        let cover_file = match &tags.cover {
            Some(bytes) => {
                let mut file = tempfile::Builder::new()
                    .prefix("cover-")
                    .suffix(".jpg")
                    .tempfile()?;
                file.write_all(bytes)?;
                file.flush()?;
                Some(file)
            }
            None => None,
        };

        let staging = TempPath::from_path(staging_path(path));
        let args = tag_args(
            path,
            cover_file.as_ref().map(|f| f.path()),
            tags,
            &staging,
        );
        debug!("Writing tags to {}", path.display());

        run_ffmpeg(&self.ffmpeg_path, args).await.map_err(failed)?;

        tokio::fs::rename(&staging, path)
            .await
            .map_err(|e| failed(format!("failed to replace original: {}", e)))?;
        staging.keep().map_err(|e| failed(e.to_string()))?;

        info!("Tagged {}", path.display());
        Ok(())
    }
}
