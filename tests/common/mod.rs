//! In-memory collaborators shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tubeloader::batch::Confirm;
use tubeloader::downloader::{ByteFetcher, Progress};
use tubeloader::extractor::{
    PlaylistEntry, PlaylistInfo, ResolvedVideo, SourceResolver, StreamDescriptor, StreamKind,
    VideoDescriptor,
};
use tubeloader::media::{MediaTranscoder, MergeSettings, TagSet, TagWriter};
use tubeloader::pipeline::Toolset;
use tubeloader::utils::error::{RestrictionKind, Result, TubeError};

pub fn stream(id: &str, kind: StreamKind, container: &str, res: Option<u32>, abr: Option<f32>) -> StreamDescriptor {
    StreamDescriptor {
        format_id: id.to_string(),
        kind,
        container: container.to_string(),
        codec_mime: format!("media/{}", container),
        resolution: res,
        frame_rate: None,
        bitrate: abr,
        locator: format!("mem://{}/{}", id, container),
        filesize: None,
    }
}

pub fn video(id: &str, title: &str, author: &str) -> ResolvedVideo {
    ResolvedVideo {
        descriptor: VideoDescriptor {
            id: id.to_string(),
            title: title.to_string(),
            author: author.to_string(),
            url: url_for(id),
            thumbnail: Some(format!("mem://thumb/{}", id)),
            provider_metadata: Default::default(),
        },
        streams: vec![
            stream(&format!("{}-a", id), StreamKind::Audio, "webm", None, Some(160.0)),
            stream(&format!("{}-v", id), StreamKind::Video, "mp4", Some(1080), None),
            stream(&format!("{}-p", id), StreamKind::Progressive, "mp4", Some(360), None),
        ],
    }
}

pub fn url_for(id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", id)
}

#[derive(Default)]
pub struct FakeResolver {
    videos: HashMap<String, std::result::Result<ResolvedVideo, RestrictionKind>>,
    playlist: Option<PlaylistInfo>,
    pub resolved: Mutex<Vec<String>>,
}

impl FakeResolver {
    pub fn with_video(mut self, video: ResolvedVideo) -> Self {
        self.videos.insert(video.descriptor.url.clone(), Ok(video));
        self
    }

    pub fn with_restricted(mut self, id: &str, kind: RestrictionKind) -> Self {
        self.videos.insert(url_for(id), Err(kind));
        self
    }

    pub fn with_playlist(mut self, title: &str, ids: &[&str]) -> Self {
        self.playlist = Some(PlaylistInfo {
            title: title.to_string(),
            entries: ids
                .iter()
                .map(|id| PlaylistEntry {
                    url: url_for(id),
                    title: Some(id.to_string()),
                })
                .collect(),
        });
        self
    }

    pub fn resolved(&self) -> Vec<String> {
        self.resolved.lock().unwrap().clone()
    }
}

#[async_trait]
impl SourceResolver for FakeResolver {
    fn id(&self) -> &'static str {
        "fake"
    }

    async fn resolve(&self, url: &str) -> Result<ResolvedVideo> {
        self.resolved.lock().unwrap().push(url.to_string());
        match self.videos.get(url) {
            Some(Ok(video)) => Ok(video.clone()),
            Some(Err(kind)) => Err(TubeError::RestrictedContent(*kind)),
            None => Err(TubeError::ExtractionFailed(format!("unknown url {}", url))),
        }
    }

    async fn resolve_playlist(&self, url: &str) -> Result<PlaylistInfo> {
        self.playlist
            .clone()
            .ok_or_else(|| TubeError::ExtractionFailed(format!("no playlist at {}", url)))
    }
}

/// Writes the locator into the target file and counts every network call
#[derive(Default)]
pub struct FakeFetcher {
    pub calls: AtomicUsize,
}

impl FakeFetcher {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ByteFetcher for FakeFetcher {
    async fn fetch_to_file(&self, url: &str, path: &Path, progress: &Progress) -> Result<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::fs::write(path, url.as_bytes()).await?;
        progress.transferred(url.len() as u64);
        Ok(url.len() as u64)
    }

    async fn fetch_bytes(&self, _url: &str) -> Result<Option<Vec<u8>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Some(vec![0xFF, 0xD8, 0xFF]))
    }
}

/// Copies inputs to outputs. Optionally cancels the batch on the n-th merge
/// and then never finishes, like an encoder interrupted mid-run.
#[derive(Default)]
pub struct FakeTranscoder {
    pub merges: AtomicUsize,
    pub cancel_on_merge: Option<(usize, CancellationToken)>,
}

#[async_trait]
impl MediaTranscoder for FakeTranscoder {
    async fn transcode_audio(&self, input: &Path, output: &Path) -> Result<()> {
        tokio::fs::copy(input, output).await?;
        Ok(())
    }

    async fn merge(&self, video: &Path, _audio: &Path, output: &Path, _settings: MergeSettings) -> Result<()> {
        let n = self.merges.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((at, token)) = &self.cancel_on_merge {
            if *at == n {
                tokio::fs::write(output, b"partial").await?;
                token.cancel();
                std::future::pending::<()>().await;
            }
        }
        tokio::fs::copy(video, output).await?;
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingTagWriter {
    pub written: Mutex<Vec<(PathBuf, TagSet)>>,
}

impl RecordingTagWriter {
    pub fn written(&self) -> Vec<(PathBuf, TagSet)> {
        self.written.lock().unwrap().clone()
    }
}

#[async_trait]
impl TagWriter for RecordingTagWriter {
    async fn write_tags(&self, path: &Path, tags: &TagSet) -> Result<()> {
        self.written
            .lock()
            .unwrap()
            .push((path.to_path_buf(), tags.clone()));
        Ok(())
    }
}

pub struct FixedAnswer(pub bool);

#[async_trait]
impl Confirm for FixedAnswer {
    async fn confirm(&self, _prompt: &str) -> Result<bool> {
        Ok(self.0)
    }
}

/// Cancels the batch while the question is open, then answers yes
pub struct CancellingAnswer(pub CancellationToken);

#[async_trait]
impl Confirm for CancellingAnswer {
    async fn confirm(&self, _prompt: &str) -> Result<bool> {
        self.0.cancel();
        Ok(true)
    }
}

pub struct Fakes {
    pub resolver: Arc<FakeResolver>,
    pub fetcher: Arc<FakeFetcher>,
    pub transcoder: Arc<FakeTranscoder>,
    pub tag_writer: Arc<RecordingTagWriter>,
}

impl Fakes {
    pub fn new(resolver: FakeResolver, transcoder: FakeTranscoder) -> Self {
        Self {
            resolver: Arc::new(resolver),
            fetcher: Arc::new(FakeFetcher::default()),
            transcoder: Arc::new(transcoder),
            tag_writer: Arc::new(RecordingTagWriter::default()),
        }
    }

    pub fn toolset(&self) -> Toolset {
        Toolset {
            resolver: self.resolver.clone(),
            fetcher: self.fetcher.clone(),
            transcoder: self.transcoder.clone(),
            tag_writer: self.tag_writer.clone(),
        }
    }
}

pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
