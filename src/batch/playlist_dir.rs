//! Playlist output directory preparation

use crate::utils::error::{Result, TubeError};
use async_trait::async_trait;
use std::io::{self, BufRead, Write};
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Yes/no question put to the user
#[async_trait]
pub trait Confirm: Send + Sync {
    async fn confirm(&self, prompt: &str) -> Result<bool>;
}

/// Asks on stdout and reads the answer from stdin; only `y` counts as yes
pub struct StdinConfirm;

#[async_trait]
impl Confirm for StdinConfirm {
    async fn confirm(&self, prompt: &str) -> Result<bool> {
        let prompt = prompt.to_string();
        let answer = tokio::task::spawn_blocking(move || -> io::Result<String> {
            let mut stdout = io::stdout().lock();
            write!(stdout, "{} [y/N] ", prompt)?;
            stdout.flush()?;
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            Ok(line)
        })
        .await
        .map_err(|e| TubeError::Io(io::Error::new(io::ErrorKind::Other, e)))??;

        Ok(is_yes(&answer))
    }
}

pub fn is_yes(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("y")
}

/// Make sure `dir` exists. If it already holds files the user is asked
/// whether to clear them; anything but yes keeps them, so existing outputs
/// are then skipped instead of downloaded again.
///
/// Cancelling `cancel` while the question is open, or before the answer is
/// acted on, returns `UserCancelled` with every file still in place.
pub async fn prepare_playlist_dir(
    dir: &Path,
    confirm: &dyn Confirm,
    cancel: &CancellationToken,
) -> Result<()> {
    if !dir.exists() {
        tokio::fs::create_dir_all(dir).await?;
        debug!("Created playlist directory {}", dir.display());
        return Ok(());
    }

    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            files.push(entry.path());
        }
    }
    if files.is_empty() {
        return Ok(());
    }

    let prompt = format!(
        "Directory {} already contains {} file(s). Remove them?",
        dir.display(),
        files.len()
    );
    let clear = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(TubeError::UserCancelled),
        answer = confirm.confirm(&prompt) => answer?,
    };
    if !clear {
        info!("Keeping existing files in {}", dir.display());
        return Ok(());
    }
    if cancel.is_cancelled() {
        return Err(TubeError::UserCancelled);
    }

    for file in &files {
        if let Err(e) = tokio::fs::remove_file(file).await {
            warn!("Failed to remove {}: {}", file.display(), e);
        }
    }
    info!("Removed {} file(s) from {}", files.len(), dir.display());
    Ok(())
}
