//! Output naming and on-disk layout

use std::path::{Path, PathBuf};

/// Characters that are invalid in filenames on at least one supported filesystem
const FORBIDDEN_CHARS: [char; 11] = ['/', '\\', '?', '%', '*', ':', '|', '"', '<', '>', '\0'];

/// Width of the positional prefix given to playlist audio files
pub const PREFIX_WIDTH: usize = 3;

/// Sanitizes a title so it can be used as a filename.
///
/// Every forbidden character is replaced by `_`, then every non-ASCII
/// code point is replaced by `_` as well. The function is total and
/// idempotent: sanitizing an already sanitized name returns it unchanged.
///
/// # Examples
/// ```
/// use tubeloader::utils::organizer::sanitize_filename;
/// assert_eq!(sanitize_filename("AC/DC: Live?"), "AC_DC_ Live_");
/// assert_eq!(sanitize_filename("Café"), "Caf_");
/// ```
pub fn sanitize_filename(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if FORBIDDEN_CHARS.contains(&c) || !c.is_ascii() {
                '_'
            } else {
                c
            }
        })
        .collect()
}

/// Zero-padded positional prefix for playlist entries
pub fn positional_prefix(index: usize) -> String {
    format!("{:0width$}", index, width = PREFIX_WIDTH)
}

/// Final audio filename: `[NNN-]<title>.mp3`
pub fn audio_file_name(title: &str, prefix: Option<&str>) -> String {
    let base = sanitize_filename(title);
    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{}-{}.mp3", prefix, base),
        _ => format!("{}.mp3", base),
    }
}

/// Final or intermediate filename for a title with the given container extension
pub fn media_file_name(title: &str, ext: &str) -> String {
    sanitize_filename(&format!("{}.{}", title, ext))
}

/// Directory a playlist is downloaded into
pub fn playlist_dir_name(title: &str) -> String {
    format!("playlist-{}", sanitize_filename(&title.replace(' ', "_")))
}

/// Isolated working directory for a merge, keyed by process and title
pub fn work_dir_name(pid: u32, title: &str) -> String {
    format!("{}_{}", pid, sanitize_filename(title))
}

/// Returns the output path if it already exists in `dir`
pub fn existing_output(dir: &Path, file_name: &str) -> Option<PathBuf> {
    let path = dir.join(file_name);
    path.exists().then_some(path)
}

/// Truncate a title for single-line progress display
pub fn truncate_title(title: &str, max_chars: usize) -> String {
    title.chars().take(max_chars).collect()
}
