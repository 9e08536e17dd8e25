//! Assembly step: turn selected streams into final files on disk
//!
//! Final names only ever appear through a rename of a finished file, so an
//! existing output is always a complete one.

use crate::downloader::{download, ByteFetcher, DownloadJob, Progress};
use crate::extractor::{ResolvedVideo, StreamDescriptor};
use crate::media::{CompressionPreset, MediaTranscoder, MergeSettings};
use crate::pipeline::select::{
    prefer_container, select_audio, select_progressive, select_video, PREFERRED_VIDEO_CONTAINER,
};
use crate::pipeline::workdir::{promote, scratch_file, work_dir};
use crate::utils::config::{RunConfig, SelectionPolicy};
use crate::utils::error::Result;
use crate::utils::organizer::{audio_file_name, existing_output, media_file_name};
use std::fmt;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyState {
    Idle,
    Downloading,
    MergingOrTranscoding,
    Done,
    Failed,
}

impl fmt::Display for AssemblyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AssemblyState::Idle => "idle",
            AssemblyState::Downloading => "downloading",
            AssemblyState::MergingOrTranscoding => "merging/transcoding",
            AssemblyState::Done => "done",
            AssemblyState::Failed => "failed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Audio,
    Video,
}

/// A finished output file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledAsset {
    pub path: PathBuf,
    pub kind: AssetKind,
}

/// An output still under a scratch name. Dropping it discards the file;
/// [`StagedAsset::commit`] moves it to its final name.
#[derive(Debug)]
pub struct StagedAsset {
    scratch: TempPath,
    final_path: PathBuf,
    kind: AssetKind,
}

impl StagedAsset {
    /// Where the file currently lives
    pub fn path(&self) -> &Path {
        &self.scratch
    }

    pub fn final_path(&self) -> &Path {
        &self.final_path
    }

    pub async fn commit(self) -> Result<AssembledAsset> {
        let path = promote(self.scratch, &self.final_path).await?;
        info!("Saved {}", path.display());
        Ok(AssembledAsset {
            path,
            kind: self.kind,
        })
    }
}

/// Result of one assembly run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assembly<T = AssembledAsset> {
    Produced(T),
    /// The output already existed; nothing was fetched
    Existing(PathBuf),
}

/// Drives downloads and transcoding for one item.
///
/// Every intermediate file is owned by a `tempfile` guard, so an error or a
/// dropped future leaves only finished outputs behind.
pub struct Assembler<'a> {
    fetcher: &'a dyn ByteFetcher,
    transcoder: &'a dyn MediaTranscoder,
    config: &'a RunConfig,
    progress: &'a Progress,
    state: AssemblyState,
}

impl<'a> Assembler<'a> {
    pub fn new(
        fetcher: &'a dyn ByteFetcher,
        transcoder: &'a dyn MediaTranscoder,
        config: &'a RunConfig,
        progress: &'a Progress,
    ) -> Self {
        Self {
            fetcher,
            transcoder,
            config,
            progress,
            state: AssemblyState::Idle,
        }
    }

    pub fn state(&self) -> AssemblyState {
        self.state
    }

    fn transition(&mut self, next: AssemblyState) {
        debug!("Assembly {} -> {}", self.state, next);
        self.state = next;
    }

    fn settle<T>(&mut self, result: Result<T>) -> Result<T> {
        self.transition(if result.is_ok() {
            AssemblyState::Done
        } else {
            AssemblyState::Failed
        });
        result
    }

    /// Best audio stream transcoded to MP3 and staged for
    /// `<dir>/[NNN-]<title>.mp3`. The caller tags it, then commits.
    pub async fn assemble_audio(
        &mut self,
        video: &ResolvedVideo,
        dir: &Path,
        prefix: Option<&str>,
    ) -> Result<Assembly<StagedAsset>> {
        let final_name = audio_file_name(&video.descriptor.title, prefix);
        if let Some(existing) = existing_output(dir, &final_name) {
            self.progress
                .narrate(format!("Audio has been skipped: {} already exists", final_name));
            return Ok(Assembly::Existing(existing));
        }

        let result = self.audio_inner(video, dir, dir.join(&final_name)).await;
        self.settle(result)
    }

    async fn audio_inner(
        &mut self,
        video: &ResolvedVideo,
        dir: &Path,
        final_path: PathBuf,
    ) -> Result<Assembly<StagedAsset>> {
        let stream = select_audio(&video.streams)?;
        debug!("Selected audio stream {}", stream.describe());

        self.transition(AssemblyState::Downloading);
        self.progress.narrate("Downloading audio...");
        let source = scratch_file(dir, &stream.container)?;
        download(
            self.fetcher,
            DownloadJob::new(stream, source.to_path_buf()),
            self.progress,
        )
        .await?;

        self.transition(AssemblyState::MergingOrTranscoding);
        self.progress.narrate("Converting audio to mp3...");
        let output = scratch_file(dir, "mp3")?;
        self.transcoder.transcode_audio(&source, &output).await?;

        Ok(Assembly::Produced(StagedAsset {
            scratch: output,
            final_path,
            kind: AssetKind::Audio,
        }))
    }

    /// Video output, one progressive download unless the policy asks for
    /// merging separate streams
    pub async fn assemble_video(&mut self, video: &ResolvedVideo, dir: &Path) -> Result<Assembly> {
        let final_name = media_file_name(&video.descriptor.title, PREFERRED_VIDEO_CONTAINER);
        if let Some(existing) = existing_output(dir, &final_name) {
            self.progress
                .narrate(format!("Video has been skipped: {} already exists", final_name));
            return Ok(Assembly::Existing(existing));
        }

        let policy = self.config.selection_policy();
        let result = if policy.progressive {
            self.progressive_inner(video, dir, &policy).await
        } else {
            self.merge_inner(video, dir, &policy, &final_name).await
        };
        self.settle(result)
    }

    async fn progressive_inner(
        &mut self,
        video: &ResolvedVideo,
        dir: &Path,
        policy: &SelectionPolicy,
    ) -> Result<Assembly> {
        let stream = select_progressive(&video.streams, policy)?;
        debug!("Selected progressive stream {}", stream.describe());

        let final_name = media_file_name(&video.descriptor.title, &stream.container);
        if let Some(existing) = existing_output(dir, &final_name) {
            return Ok(Assembly::Existing(existing));
        }

        self.transition(AssemblyState::Downloading);
        self.progress.narrate("Downloading video...");
        let output = scratch_file(dir, &stream.container)?;
        download(
            self.fetcher,
            DownloadJob::new(stream, output.to_path_buf()),
            self.progress,
        )
        .await?;

        let path = promote(output, &dir.join(&final_name)).await?;
        info!("Video saved to {}", path.display());
        Ok(Assembly::Produced(AssembledAsset {
            path,
            kind: AssetKind::Video,
        }))
    }

    async fn merge_inner(
        &mut self,
        video: &ResolvedVideo,
        dir: &Path,
        policy: &SelectionPolicy,
        final_name: &str,
    ) -> Result<Assembly> {
        let preset = CompressionPreset::from_level(self.config.compress_level)?;
        let candidates: Vec<StreamDescriptor> =
            prefer_container(&video.streams, PREFERRED_VIDEO_CONTAINER)
                .into_iter()
                .cloned()
                .collect();
        let video_stream = select_video(&candidates, policy.max_resolution)?;
        let audio_stream = select_audio(&candidates)?;
        debug!(
            "Selected {} + {} for merge",
            video_stream.describe(),
            audio_stream.describe()
        );

        let work = work_dir(dir, &video.descriptor.title)?;

        self.transition(AssemblyState::Downloading);
        self.progress.narrate("Downloading video...");
        let video_path = download(
            self.fetcher,
            DownloadJob::new(
                video_stream,
                work.path()
                    .join(media_file_name("video", &video_stream.container)),
            ),
            self.progress,
        )
        .await?;

        self.progress.narrate("Downloading audio...");
        let audio_path = download(
            self.fetcher,
            DownloadJob::new(
                audio_stream,
                work.path()
                    .join(media_file_name("audio", &audio_stream.container)),
            ),
            self.progress,
        )
        .await?;

        self.transition(AssemblyState::MergingOrTranscoding);
        self.progress
            .narrate(format!("Merging video and audio ({} preset)...", preset));
        let merged = work.path().join(final_name);
        self.transcoder
            .merge(
                &video_path,
                &audio_path,
                &merged,
                MergeSettings {
                    preset,
                    threads: self.config.threads,
                },
            )
            .await?;

        let path = dir.join(final_name);
        tokio::fs::rename(&merged, &path).await?;
        info!("Video saved to {}", path.display());
        Ok(Assembly::Produced(AssembledAsset {
            path,
            kind: AssetKind::Video,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::{StreamKind, VideoDescriptor};
    use crate::utils::error::TubeError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn stream(id: &str, kind: StreamKind, container: &str, res: Option<u32>, abr: Option<f32>) -> StreamDescriptor {
        StreamDescriptor {
            format_id: id.to_string(),
            kind,
            container: container.to_string(),
            codec_mime: format!("media/{}", container),
            resolution: res,
            frame_rate: None,
            bitrate: abr,
            locator: format!("mem://{}", id),
            filesize: None,
        }
    }

    fn resolved(title: &str) -> ResolvedVideo {
        ResolvedVideo {
            descriptor: VideoDescriptor {
                id: "id1".to_string(),
                title: title.to_string(),
                author: "Someone".to_string(),
                url: "https://example.com/watch?v=id1".to_string(),
                ..Default::default()
            },
            streams: vec![
                stream("251", StreamKind::Audio, "webm", None, Some(160.0)),
                stream("140", StreamKind::Audio, "m4a", None, Some(128.0)),
                stream("137", StreamKind::Video, "mp4", Some(1080), None),
                stream("248", StreamKind::Video, "webm", Some(1080), None),
                stream("18", StreamKind::Progressive, "mp4", Some(360), None),
            ],
        }
    }

    #[derive(Default)]
    struct MemFetcher {
        fetched: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ByteFetcher for MemFetcher {
        async fn fetch_to_file(&self, url: &str, path: &Path, _progress: &Progress) -> Result<u64> {
            self.fetched.lock().unwrap().push(url.to_string());
            tokio::fs::write(path, url.as_bytes()).await?;
            Ok(url.len() as u64)
        }

        async fn fetch_bytes(&self, _url: &str) -> Result<Option<Vec<u8>>> {
            Ok(None)
        }
    }

    #[derive(Default)]
    struct CopyTranscoder {
        fail: bool,
        merges: AtomicUsize,
    }

    #[async_trait]
    impl MediaTranscoder for CopyTranscoder {
        async fn transcode_audio(&self, input: &Path, output: &Path) -> Result<()> {
            if self.fail {
                return Err(TubeError::TranscodeFailed("encoder crashed".to_string()));
            }
            tokio::fs::copy(input, output).await?;
            Ok(())
        }

        async fn merge(&self, video: &Path, _audio: &Path, output: &Path, _settings: MergeSettings) -> Result<()> {
            self.merges.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(TubeError::TranscodeFailed("merge failed".to_string()));
            }
            tokio::fs::copy(video, output).await?;
            Ok(())
        }
    }

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_audio_path_leaves_only_mp3() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = MemFetcher::default();
        let transcoder = CopyTranscoder::default();
        let config = RunConfig::default();
        let progress = Progress::disabled();
        let mut assembler = Assembler::new(&fetcher, &transcoder, &config, &progress);

        let result = assembler
            .assemble_audio(&resolved("Song"), dir.path(), Some("004"))
            .await
            .unwrap();
        let staged = match result {
            Assembly::Produced(staged) => staged,
            other => panic!("expected a staged asset, got {:?}", other),
        };

        assert_eq!(staged.final_path(), dir.path().join("004-Song.mp3"));
        assert!(!dir.path().join("004-Song.mp3").exists());
        assert_eq!(entries(dir.path()).len(), 1);

        let asset = staged.commit().await.unwrap();
        assert_eq!(
            asset,
            AssembledAsset {
                path: dir.path().join("004-Song.mp3"),
                kind: AssetKind::Audio,
            }
        );
        assert_eq!(entries(dir.path()), vec!["004-Song.mp3"]);
        assert_eq!(*fetcher.fetched.lock().unwrap(), vec!["mem://251"]);
        assert_eq!(assembler.state(), AssemblyState::Done);
    }

    #[tokio::test]
    async fn test_dropped_staged_audio_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = MemFetcher::default();
        let transcoder = CopyTranscoder::default();
        let config = RunConfig::default();
        let progress = Progress::disabled();
        let mut assembler = Assembler::new(&fetcher, &transcoder, &config, &progress);

        let result = assembler
            .assemble_audio(&resolved("Song"), dir.path(), None)
            .await
            .unwrap();
        drop(result);

        assert!(entries(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_audio_intermediate_keeps_clear_of_same_container_video() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Song.webm"), b"video").unwrap();
        let fetcher = MemFetcher::default();
        let transcoder = CopyTranscoder::default();
        let config = RunConfig::default();
        let progress = Progress::disabled();
        let mut assembler = Assembler::new(&fetcher, &transcoder, &config, &progress);

        let result = assembler
            .assemble_audio(&resolved("Song"), dir.path(), None)
            .await
            .unwrap();
        if let Assembly::Produced(staged) = result {
            staged.commit().await.unwrap();
        }

        assert_eq!(entries(dir.path()), vec!["Song.mp3", "Song.webm"]);
        assert_eq!(std::fs::read(dir.path().join("Song.webm")).unwrap(), b"video");
    }

    #[tokio::test]
    async fn test_existing_audio_skips_without_fetching() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Song.mp3"), b"old").unwrap();
        let fetcher = MemFetcher::default();
        let transcoder = CopyTranscoder::default();
        let config = RunConfig::default();
        let progress = Progress::disabled();
        let mut assembler = Assembler::new(&fetcher, &transcoder, &config, &progress);

        let result = assembler
            .assemble_audio(&resolved("Song"), dir.path(), None)
            .await
            .unwrap();

        assert!(matches!(result, Assembly::Existing(ref path) if *path == dir.path().join("Song.mp3")));
        assert!(fetcher.fetched.lock().unwrap().is_empty());
        assert_eq!(std::fs::read(dir.path().join("Song.mp3")).unwrap(), b"old");
        assert_eq!(assembler.state(), AssemblyState::Idle);
    }

    #[tokio::test]
    async fn test_failed_transcode_removes_intermediate() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = MemFetcher::default();
        let transcoder = CopyTranscoder {
            fail: true,
            ..Default::default()
        };
        let config = RunConfig::default();
        let progress = Progress::disabled();
        let mut assembler = Assembler::new(&fetcher, &transcoder, &config, &progress);

        let result = assembler
            .assemble_audio(&resolved("Song"), dir.path(), None)
            .await;

        assert!(matches!(result, Err(TubeError::TranscodeFailed(_))));
        assert!(entries(dir.path()).is_empty());
        assert_eq!(assembler.state(), AssemblyState::Failed);
    }

    #[tokio::test]
    async fn test_progressive_download_lands_on_final_name() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = MemFetcher::default();
        let transcoder = CopyTranscoder::default();
        let config = RunConfig::default();
        let progress = Progress::disabled();
        let mut assembler = Assembler::new(&fetcher, &transcoder, &config, &progress);

        let result = assembler
            .assemble_video(&resolved("Clip"), dir.path())
            .await
            .unwrap();

        assert_eq!(
            result,
            Assembly::Produced(AssembledAsset {
                path: dir.path().join("Clip.mp4"),
                kind: AssetKind::Video,
            })
        );
        assert_eq!(entries(dir.path()), vec!["Clip.mp4"]);
        assert_eq!(*fetcher.fetched.lock().unwrap(), vec!["mem://18"]);
        assert_eq!(transcoder.merges.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_merge_path_prefers_mp4_and_cleans_work_dir() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = MemFetcher::default();
        let transcoder = CopyTranscoder::default();
        let config = RunConfig {
            development: true,
            ..Default::default()
        };
        let progress = Progress::disabled();
        let mut assembler = Assembler::new(&fetcher, &transcoder, &config, &progress);

        assembler
            .assemble_video(&resolved("Clip"), dir.path())
            .await
            .unwrap();

        assert_eq!(entries(dir.path()), vec!["Clip.mp4"]);
        assert_eq!(
            *fetcher.fetched.lock().unwrap(),
            vec!["mem://137", "mem://251"]
        );
        assert_eq!(transcoder.merges.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_merge_removes_work_dir() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = MemFetcher::default();
        let transcoder = CopyTranscoder {
            fail: true,
            ..Default::default()
        };
        let config = RunConfig {
            development: true,
            ..Default::default()
        };
        let progress = Progress::disabled();
        let mut assembler = Assembler::new(&fetcher, &transcoder, &config, &progress);

        let result = assembler.assemble_video(&resolved("Clip"), dir.path()).await;

        assert!(matches!(result, Err(TubeError::TranscodeFailed(_))));
        assert!(entries(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_merge_without_video_under_cap() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = MemFetcher::default();
        let transcoder = CopyTranscoder::default();
        let config = RunConfig {
            development: true,
            max_resolution: 720,
            ..Default::default()
        };
        let progress = Progress::disabled();
        let mut assembler = Assembler::new(&fetcher, &transcoder, &config, &progress);

        let result = assembler.assemble_video(&resolved("Clip"), dir.path()).await;

        assert!(matches!(result, Err(TubeError::NoSuitableStream("video"))));
        assert!(fetcher.fetched.lock().unwrap().is_empty());
        assert!(entries(dir.path()).is_empty());
    }
}
