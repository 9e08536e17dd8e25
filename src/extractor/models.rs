//! Data structures for resolved videos and their streams

use serde::Deserialize;
use std::collections::BTreeMap;

/// Provider metadata key for the performing artist
pub const META_ARTIST: &str = "Artist";
/// Provider metadata key for the song title
pub const META_SONG: &str = "Song";
/// Provider metadata key for the album
pub const META_ALBUM: &str = "Album";

/// Video-level facts, immutable once resolved
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoDescriptor {
    pub id: String,
    pub title: String,
    pub author: String,
    pub url: String,
    pub thumbnail: Option<String>,
    pub provider_metadata: BTreeMap<String, String>,
}

/// What a stream carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Audio,
    Video,
    /// Audio and video already muxed together
    Progressive,
}

/// One fetchable sub-stream of a remote video
#[derive(Debug, Clone, PartialEq)]
pub struct StreamDescriptor {
    pub format_id: String,
    pub kind: StreamKind,
    /// Container extension, e.g. `mp4`, `webm`, `m4a`
    pub container: String,
    /// e.g. `video/mp4`, `audio/webm`
    pub codec_mime: String,
    /// Vertical resolution in lines
    pub resolution: Option<u32>,
    pub frame_rate: Option<f32>,
    /// kbit/s
    pub bitrate: Option<f32>,
    pub locator: String,
    pub filesize: Option<u64>,
}

impl StreamDescriptor {
    pub fn is_audio_only(&self) -> bool {
        self.kind == StreamKind::Audio
    }

    pub fn is_video_only(&self) -> bool {
        self.kind == StreamKind::Video
    }

    pub fn is_progressive(&self) -> bool {
        self.kind == StreamKind::Progressive
    }

    /// Short human description used in narration
    pub fn describe(&self) -> String {
        match self.kind {
            StreamKind::Audio => match self.bitrate {
                Some(abr) => format!("{} {:.0}kbps", self.container, abr),
                None => self.container.clone(),
            },
            StreamKind::Video | StreamKind::Progressive => {
                let mut out = match self.resolution {
                    Some(res) => format!("{}p", res),
                    None => "unknown resolution".to_string(),
                };
                if let Some(fps) = self.frame_rate {
                    out.push_str(&format!(" in {:.0} fps", fps));
                }
                out
            }
        }
    }
}

/// A video together with every stream the provider offers for it
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedVideo {
    pub descriptor: VideoDescriptor,
    pub streams: Vec<StreamDescriptor>,
}

/// One entry of a playlist, not yet resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistEntry {
    pub url: String,
    pub title: Option<String>,
}

impl PlaylistEntry {
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
        }
    }

    /// Title for display before the entry is resolved
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.url)
    }
}

/// Playlist title and its ordered entries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistInfo {
    pub title: String,
    pub entries: Vec<PlaylistEntry>,
}

// ============================================================
// yt-dlp JSON shapes
// ============================================================

/// Subset of `yt-dlp --dump-json` output
#[derive(Debug, Clone, Deserialize)]
pub struct YtDlpVideo {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub webpage_url: Option<String>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub track: Option<String>,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub formats: Vec<YtDlpFormat>,
}

/// One entry of the `formats` array
#[derive(Debug, Clone, Deserialize)]
pub struct YtDlpFormat {
    pub format_id: String,
    #[serde(default)]
    pub ext: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub fps: Option<f32>,
    #[serde(default)]
    pub vcodec: Option<String>,
    #[serde(default)]
    pub acodec: Option<String>,
    #[serde(default)]
    pub abr: Option<f32>,
    #[serde(default)]
    pub tbr: Option<f32>,
    #[serde(default)]
    pub filesize: Option<u64>,
    #[serde(default)]
    pub protocol: Option<String>,
}

/// Output of `yt-dlp --flat-playlist --dump-single-json`
#[derive(Debug, Clone, Deserialize)]
pub struct YtDlpPlaylist {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub entries: Vec<YtDlpPlaylistEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YtDlpPlaylistEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

fn codec_present(codec: &Option<String>) -> bool {
    codec.as_deref().is_some_and(|c| c != "none")
}

impl YtDlpFormat {
    /// Convert into a stream descriptor; storyboards and manifests are dropped
    pub fn into_stream(self) -> Option<StreamDescriptor> {
        let locator = self.url?;
        if matches!(self.protocol.as_deref(), Some("mhtml") | Some("m3u8") | Some("m3u8_native")) {
            return None;
        }

        let has_video = codec_present(&self.vcodec);
        let has_audio = codec_present(&self.acodec);
        let kind = match (has_video, has_audio) {
            (true, true) => StreamKind::Progressive,
            (true, false) => StreamKind::Video,
            (false, true) => StreamKind::Audio,
            (false, false) => return None,
        };

        let media_type = if kind == StreamKind::Audio { "audio" } else { "video" };
        Some(StreamDescriptor {
            codec_mime: format!("{}/{}", media_type, self.ext),
            container: self.ext,
            kind,
            resolution: if kind == StreamKind::Audio { None } else { self.height },
            frame_rate: self.fps,
            bitrate: self.abr.or(self.tbr),
            format_id: self.format_id,
            locator,
            filesize: self.filesize,
        })
    }
}

impl From<YtDlpVideo> for ResolvedVideo {
    fn from(raw: YtDlpVideo) -> Self {
        let mut provider_metadata = BTreeMap::new();
        if let Some(artist) = raw.artist {
            provider_metadata.insert(META_ARTIST.to_string(), artist);
        }
        if let Some(track) = raw.track {
            provider_metadata.insert(META_SONG.to_string(), track);
        }
        if let Some(album) = raw.album {
            provider_metadata.insert(META_ALBUM.to_string(), album);
        }

        let descriptor = VideoDescriptor {
            url: raw
                .webpage_url
                .unwrap_or_else(|| format!("https://www.youtube.com/watch?v={}", raw.id)),
            id: raw.id,
            title: raw.title,
            author: raw.uploader.or(raw.channel).unwrap_or_default(),
            thumbnail: raw.thumbnail,
            provider_metadata,
        };
        let streams = raw
            .formats
            .into_iter()
            .filter_map(YtDlpFormat::into_stream)
            .collect();

        ResolvedVideo {
            descriptor,
            streams,
        }
    }
}
