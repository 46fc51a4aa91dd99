//! HTTP Download Manager
//!
//! Single-attempt fetches of remote text and files with progress tracking.
//! Classifies failures so the orchestrator can decide what is retryable.

use futures_util::StreamExt;
use reqwest::StatusCode;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Download result with metadata
#[derive(Debug)]
pub struct DownloadResult {
    pub path: PathBuf,
    pub bytes_downloaded: u64,
    pub content_length: Option<u64>,
}

#[derive(Error, Debug)]
pub enum FetchError {
    /// The endpoint answered 404; usually a bad subscription key
    #[error("Not found: {url}")]
    NotFound { url: String },
    #[error("Transfer of {url} failed: {message}")]
    Transfer {
        url: String,
        status: Option<u16>,
        message: String,
    },
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FetchError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transfer { .. })
    }

    fn network(url: &str, e: reqwest::Error) -> Self {
        Self::Transfer {
            url: url.to_string(),
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }

    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Integer percent tracker; reports each percent value at most once
#[derive(Debug)]
pub struct ProgressTracker {
    content_length: Option<u64>,
    received: u64,
    last_percent: Option<u8>,
}

impl ProgressTracker {
    pub fn new(content_length: Option<u64>) -> Self {
        Self {
            content_length: content_length.filter(|len| *len > 0),
            received: 0,
            last_percent: None,
        }
    }

    /// Account for `bytes` more; returns the percent if it changed
    pub fn advance(&mut self, bytes: u64) -> Option<u8> {
        self.received += bytes;
        let total = self.content_length?;
        let percent = (self.received.saturating_mul(100) / total).min(100) as u8;
        if self.last_percent == Some(percent) {
            return None;
        }
        self.last_percent = Some(percent);
        Some(percent)
    }

    pub fn received(&self) -> u64 {
        self.received
    }
}

/// Download manager for remote snapshot resources
pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("snapshot-updater/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self { client }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::network(url, e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound {
                url: url.to_string(),
            });
        }
        if !status.is_success() {
            return Err(FetchError::Transfer {
                url: url.to_string(),
                status: Some(status.as_u16()),
                message: format!("unexpected status code ({})", status.as_u16()),
            });
        }
        Ok(response)
    }

    /// Fetch a small plain-text resource (version token, checksum)
    pub async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        debug!(url, "fetching text");
        self.get(url)
            .await?
            .text()
            .await
            .map_err(|e| FetchError::network(url, e))
    }

    /// Stream `url` into `dest`, replacing any existing file
    ///
    /// `on_progress` receives integer percents, de-duplicated. Nothing is
    /// reported when the server sends no `Content-Length`.
    pub async fn fetch_to_file<F>(
        &self,
        url: &str,
        dest: &Path,
        mut on_progress: F,
    ) -> Result<DownloadResult, FetchError>
    where
        F: FnMut(u8),
    {
        if fs::try_exists(dest).await.map_err(|e| FetchError::io(dest, e))? {
            debug!(path = %dest.display(), "removing stale download");
            fs::remove_file(dest).await.map_err(|e| FetchError::io(dest, e))?;
        }

        debug!(url, dest = %dest.display(), "downloading");
        let response = self.get(url).await?;
        let content_length = response.content_length();

        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| FetchError::io(parent, e))?;
        }
        let mut file = fs::File::create(dest).await.map_err(|e| FetchError::io(dest, e))?;

        let mut progress = ProgressTracker::new(content_length);
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| FetchError::network(url, e))?;
            file.write_all(&chunk).await.map_err(|e| FetchError::io(dest, e))?;
            if let Some(percent) = progress.advance(chunk.len() as u64) {
                on_progress(percent);
            }
        }

        file.flush().await.map_err(|e| FetchError::io(dest, e))?;
        drop(file);

        Ok(DownloadResult {
            path: dest.to_path_buf(),
            bytes_downloaded: progress.received(),
            content_length,
        })
    }
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new()
    }
}
