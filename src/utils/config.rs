//! Run configuration

use crate::utils::error::{Result, TubeError};
use std::path::PathBuf;

/// Default cap on video resolution, in lines
pub const DEFAULT_MAX_RESOLUTION: u32 = 1080;

/// Default compression level (maps to the `medium` preset)
pub const DEFAULT_COMPRESS_LEVEL: i64 = 5;

/// Highest accepted compression level
pub const MAX_COMPRESS_LEVEL: i64 = 9;

/// Which kind of output a run produces for each item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum TargetFormat {
    #[default]
    Audio,
    Video,
    Both,
}

impl TargetFormat {
    pub fn wants_audio(self) -> bool {
        matches!(self, TargetFormat::Audio | TargetFormat::Both)
    }

    pub fn wants_video(self) -> bool {
        matches!(self, TargetFormat::Video | TargetFormat::Both)
    }
}

/// Stream selection constraints derived from the run configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionPolicy {
    pub max_resolution: u32,
    /// Download one muxed stream instead of merging separate ones
    pub progressive: bool,
    /// Apply `max_resolution` to progressive streams too
    pub cap_progressive: bool,
}

/// Explicit metadata values that win over anything the provider supplies
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagOverrides {
    pub artist: Option<String>,
    pub title: Option<String>,
    pub album: Option<String>,
}

impl TagOverrides {
    pub fn any(&self) -> bool {
        self.artist.is_some() || self.title.is_some() || self.album.is_some()
    }
}

/// Immutable settings for one run, built once and passed by reference
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub target: TargetFormat,
    pub max_resolution: u32,
    /// Enables the separate-stream merge path for video
    pub development: bool,
    pub cap_progressive: bool,
    /// x264 preset index; only 0 to 9 passes `validate`
    pub compress_level: i64,
    pub threads: usize,
    pub add_metadata: bool,
    pub overrides: TagOverrides,
    pub single_progress_bar: bool,
    pub silent: bool,
    pub output_dir: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            target: TargetFormat::Audio,
            max_resolution: DEFAULT_MAX_RESOLUTION,
            development: false,
            cap_progressive: false,
            compress_level: DEFAULT_COMPRESS_LEVEL,
            threads: default_threads(),
            add_metadata: true,
            overrides: TagOverrides::default(),
            single_progress_bar: false,
            silent: false,
            output_dir: PathBuf::from("."),
        }
    }
}

impl RunConfig {
    /// Reject settings that can never work, before any network activity
    pub fn validate(&self) -> Result<()> {
        if !(0..=MAX_COMPRESS_LEVEL).contains(&self.compress_level) {
            return Err(TubeError::InvalidConfiguration(format!(
                "Invalid compress level ({}). Expected a value between 0 and {}",
                self.compress_level, MAX_COMPRESS_LEVEL
            )));
        }
        if self.max_resolution == 0 {
            return Err(TubeError::InvalidConfiguration(
                "Maximal resolution must be greater than 0".to_string(),
            ));
        }
        if self.threads == 0 {
            return Err(TubeError::InvalidConfiguration(
                "Thread count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn selection_policy(&self) -> SelectionPolicy {
        SelectionPolicy {
            max_resolution: self.max_resolution,
            progressive: !self.development,
            cap_progressive: self.cap_progressive,
        }
    }

    /// Tagging is on by default for audio and forced on by any override
    pub fn tagging_enabled(&self) -> bool {
        self.add_metadata || self.overrides.any()
    }
}

/// Half of the available logical processors, at least one
pub fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get() / 2)
        .unwrap_or(1)
        .max(1)
}
