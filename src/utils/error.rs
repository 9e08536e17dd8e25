//! Error handling for tubeloader

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Why the provider refused to hand out streams for an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestrictionKind {
    /// Channel members-only content
    MembersOnly,
    /// Requires signing in to confirm age
    AgeRestricted,
    /// The provider page did not match any known extraction pattern
    Unextractable,
}

impl fmt::Display for RestrictionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RestrictionKind::MembersOnly => "members-only",
            RestrictionKind::AgeRestricted => "age-restricted",
            RestrictionKind::Unextractable => "unextractable",
        };
        f.write_str(label)
    }
}

/// Main error type for tubeloader
#[derive(Debug, Error)]
pub enum TubeError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("{0} not found. Please install it or pass its path explicitly")]
    ToolNotFound(&'static str),

    #[error("Failed to extract video info: {0}")]
    ExtractionFailed(String),

    #[error("Content is {0}")]
    RestrictedContent(RestrictionKind),

    #[error("No suitable {0} stream available")]
    NoSuitableStream(&'static str),

    #[error("Download failed: {0}")]
    FetchFailed(String),

    #[error("Transcoding failed: {0}")]
    TranscodeFailed(String),

    #[error("Tagging failed for {path}: {reason}")]
    TaggingFailed { path: PathBuf, reason: String },

    #[error("Download has been cancelled")]
    UserCancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TubeError {
    /// Errors that skip a playlist entry instead of failing it
    pub fn restriction(&self) -> Option<RestrictionKind> {
        match self {
            TubeError::RestrictedContent(kind) => Some(*kind),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for TubeError {
    fn from(e: reqwest::Error) -> Self {
        TubeError::FetchFailed(e.to_string())
    }
}

impl From<serde_json::Error> for TubeError {
    fn from(e: serde_json::Error) -> Self {
        TubeError::ExtractionFailed(format!("malformed yt-dlp output: {}", e))
    }
}

pub type Result<T> = std::result::Result<T, TubeError>;
