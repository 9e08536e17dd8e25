//! HTTP download engine

use crate::downloader::progress::{Progress, ProgressEvent};
use crate::downloader::ByteFetcher;
use crate::utils::error::{Result, TubeError};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use std::path::Path;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Download configuration
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    pub user_agent: String,
    pub connect_timeout: Duration, // Timeout for establishing a connection
    pub thumbnail_timeout: Duration, // Whole-request timeout for cover art
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36".to_string(),
            connect_timeout: Duration::from_secs(30),
            thumbnail_timeout: Duration::from_secs(15),
        }
    }
}

/// Streaming HTTP fetcher
pub struct DownloadEngine {
    client: Client,
    config: DownloadConfig,
}

impl DownloadEngine {
    /// Create new download engine with configuration
    pub fn new(config: DownloadConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| TubeError::FetchFailed(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl ByteFetcher for DownloadEngine {
    /// Single streaming GET; every chunk is reported as it is written
    async fn fetch_to_file(&self, url: &str, output_path: &Path, progress: &Progress) -> Result<u64> {
        debug!("Fetching {} into {}", url, output_path.display());

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(TubeError::FetchFailed(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        progress.send(ProgressEvent::TransferStarted {
            label: output_path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            total_bytes: response.content_length(),
        });

        let mut file = File::create(output_path).await?;
        let mut downloaded = 0u64;
        let mut stream = response.bytes_stream();

        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
            progress.transferred(chunk.len() as u64);
        }

        // Ensure file is flushed
        file.flush().await?;
        progress.send(ProgressEvent::TransferFinished);

        debug!("Fetched {} bytes into {}", downloaded, output_path.display());
        Ok(downloaded)
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Option<Vec<u8>>> {
        let response = self
            .client
            .get(url)
            .timeout(self.config.thumbnail_timeout)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            debug!("Thumbnail request returned {}", response.status());
            return Ok(None);
        }

        Ok(Some(response.bytes().await?.to_vec()))
    }
}
