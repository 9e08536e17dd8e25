//! Stream selection policy
//!
//! Ties are always broken by provider catalog order so the same stream set
//! yields the same pick on every run.

use crate::extractor::StreamDescriptor;
use crate::utils::config::SelectionPolicy;
use crate::utils::error::{Result, TubeError};
use std::cmp::Ordering;

/// Container the merge and progressive paths prefer
pub const PREFERRED_VIDEO_CONTAINER: &str = "mp4";

/// Best video-only stream whose resolution does not exceed `max_resolution`.
///
/// The highest resolution at or below the cap is found first; of the streams
/// at or below it, ordered by resolution, the last one wins, so among equal
/// resolutions the provider's last listed stream is picked.
pub fn select_video<'a>(
    streams: &'a [StreamDescriptor],
    max_resolution: u32,
) -> Result<&'a StreamDescriptor> {
    let candidates: Vec<&StreamDescriptor> = streams
        .iter()
        .filter(|s| s.is_video_only() && s.resolution.is_some())
        .collect();
    pick_highest_within(candidates, Some(max_resolution)).ok_or(TubeError::NoSuitableStream("video"))
}

/// Audio-only stream with the highest bitrate; the first listed wins a tie
pub fn select_audio(streams: &[StreamDescriptor]) -> Result<&StreamDescriptor> {
    let mut candidates: Vec<&StreamDescriptor> =
        streams.iter().filter(|s| s.is_audio_only()).collect();
    // stable sort keeps catalog order between equal bitrates
    candidates.sort_by(|a, b| {
        b.bitrate
            .unwrap_or(0.0)
            .partial_cmp(&a.bitrate.unwrap_or(0.0))
            .unwrap_or(Ordering::Equal)
    });
    candidates
        .first()
        .copied()
        .ok_or(TubeError::NoSuitableStream("audio"))
}

/// Highest resolution muxed stream. The cap only applies when
/// `policy.cap_progressive` is set.
pub fn select_progressive<'a>(
    streams: &'a [StreamDescriptor],
    policy: &SelectionPolicy,
) -> Result<&'a StreamDescriptor> {
    let candidates: Vec<&StreamDescriptor> = prefer_container(streams, PREFERRED_VIDEO_CONTAINER)
        .into_iter()
        .filter(|s| s.is_progressive())
        .collect();
    let cap = policy.cap_progressive.then_some(policy.max_resolution);
    pick_highest_within(candidates, cap).ok_or(TubeError::NoSuitableStream("progressive"))
}

/// Streams in `container` if any of the video-carrying streams use it,
/// otherwise every stream
pub fn prefer_container<'a>(
    streams: &'a [StreamDescriptor],
    container: &str,
) -> Vec<&'a StreamDescriptor> {
    let has_preferred = streams
        .iter()
        .any(|s| !s.is_audio_only() && s.container == container);
    streams
        .iter()
        .filter(|s| !has_preferred || s.is_audio_only() || s.container == container)
        .collect()
}

fn pick_highest_within(
    mut candidates: Vec<&StreamDescriptor>,
    cap: Option<u32>,
) -> Option<&StreamDescriptor> {
    let max_suitable = candidates
        .iter()
        .map(|s| resolution(s))
        .filter(|res| cap.map_or(true, |cap| *res <= cap))
        .max()?;

    candidates.retain(|s| resolution(s) <= max_suitable);
    candidates.sort_by_key(|s| resolution(s));
    candidates.last().copied()
}

fn resolution(stream: &StreamDescriptor) -> u32 {
    stream.resolution.unwrap_or(0)
}
