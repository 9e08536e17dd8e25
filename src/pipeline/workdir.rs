//! Scratch space for intermediate downloads
//!
//! Everything here is a `tempfile` guard: dropping it, whether on success,
//! on an error returned with `?` or with a cancelled future, removes it.

use crate::utils::organizer::work_dir_name;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::{TempDir, TempPath};
use tracing::debug;

const SCRATCH_PREFIX: &str = ".tubeloader-";

/// Merge workspace `<parent>/<pid>_<sanitized title>`
pub fn work_dir(parent: &Path, title: &str) -> io::Result<TempDir> {
    let dir = tempfile::Builder::new()
        .prefix(&work_dir_name(std::process::id(), title))
        .rand_bytes(0)
        .tempdir_in(parent)?;
    debug!("Created temporary directory: {}", dir.path().display());
    Ok(dir)
}

/// Uniquely named hidden file in `dir` ending in `.<extension>`
pub fn scratch_file(dir: &Path, extension: &str) -> io::Result<TempPath> {
    let file = tempfile::Builder::new()
        .prefix(SCRATCH_PREFIX)
        .suffix(&format!(".{}", extension))
        .tempfile_in(dir)?;
    Ok(file.into_temp_path())
}

/// Rename a finished scratch file to `target` and stop guarding it
pub async fn promote(scratch: TempPath, target: &Path) -> io::Result<PathBuf> {
    tokio::fs::rename(&scratch, target).await?;
    scratch.keep().map_err(io::Error::from)?;
    debug!("Promoted to {}", target.display());
    Ok(target.to_path_buf())
}
