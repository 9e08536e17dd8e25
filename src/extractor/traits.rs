use crate::extractor::models::{PlaylistInfo, ResolvedVideo};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Core trait for source resolvers
///
/// This trait isolates the pipeline from the specific extraction method
/// (yt-dlp, or an in-memory fake in tests).
#[async_trait]
pub trait SourceResolver: Send + Sync {
    /// Returns a unique identifier for this resolver (e.g. "ytdlp")
    fn id(&self) -> &'static str;

    /// Resolves video-level facts and every available stream.
    ///
    /// Members-only, age-restricted and unextractable entries fail with
    /// `TubeError::RestrictedContent`.
    async fn resolve(&self, url: &str) -> Result<ResolvedVideo>;

    /// Resolves a playlist title and its ordered entries without touching
    /// the entries' streams
    async fn resolve_playlist(&self, url: &str) -> Result<PlaylistInfo>;
}
