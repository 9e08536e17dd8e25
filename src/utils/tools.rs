//! Discovery of the external binaries the pipeline drives (yt-dlp, ffmpeg)
//!
//! Search order:
//! 1. Explicit path given on the command line
//! 2. Next to the current executable
//! 3. System PATH
//! 4. Common installation paths (Homebrew, pip user installs, ...)

use crate::utils::error::{Result, TubeError};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Locate `name`, preferring `explicit` when given
pub fn locate(name: &'static str, explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        warn!("Configured {} path does not exist: {}", name, path.display());
        return Err(TubeError::ToolNotFound(name));
    }

    if let Some(path) = find_beside_executable(name) {
        info!("Using bundled {}: {}", name, path.display());
        return Ok(path);
    }

    if let Ok(path) = which::which(name) {
        info!("Using system {}: {}", name, path.display());
        return Ok(path);
    }

    if let Some(path) = find_in_common_paths(name) {
        info!("Using {} from common path: {}", name, path.display());
        return Ok(path);
    }

    warn!("{} not found anywhere", name);
    Err(TubeError::ToolNotFound(name))
}

fn find_beside_executable(name: &str) -> Option<PathBuf> {
    let exe_path = std::env::current_exe().ok()?;
    let candidate = exe_path.parent()?.join(binary_name(name));
    debug!("Checking {}", candidate.display());
    (candidate.is_file() && is_executable(&candidate)).then_some(candidate)
}

fn find_in_common_paths(name: &str) -> Option<PathBuf> {
    let mut dirs_to_check = vec![
        // macOS Homebrew (Apple Silicon)
        PathBuf::from("/opt/homebrew/bin"),
        // macOS Homebrew (Intel)
        PathBuf::from("/usr/local/bin"),
        PathBuf::from("/usr/bin"),
    ];
    // pip --user installs
    if let Some(home) = dirs::home_dir() {
        dirs_to_check.push(home.join(".local").join("bin"));
    }

    dirs_to_check
        .into_iter()
        .map(|dir| dir.join(binary_name(name)))
        .find(|candidate| candidate.is_file() && is_executable(candidate))
}

fn binary_name(name: &str) -> String {
    if cfg!(windows) {
        format!("{}.exe", name)
    } else {
        name.to_string()
    }
}

/// Check if a file is executable
fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        std::fs::metadata(path)
            .map(|metadata| metadata.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }

    #[cfg(not(unix))]
    {
        path.exists()
    }
}
