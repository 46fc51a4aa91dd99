//! Updater Error Types

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::engine::config::ConfigError;
use crate::engine::snapshot::SnapshotError;
use crate::engine::updater::download::FetchError;

#[derive(Error, Debug)]
pub enum UpdaterError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    /// Version endpoint unreachable or answering with an error
    #[error("Network error: {0}")]
    Network(#[source] FetchError),

    /// Retryable checksum or data transfer failure
    #[error("Transfer error: {0}")]
    Transfer(#[source] FetchError),

    #[error("bad api key, {url} not found")]
    BadCredential { url: String },

    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("{url} failed after {attempts} attempt(s): {source}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        #[source]
        source: Box<UpdaterError>,
    },
}

impl UpdaterError {
    /// Whether a retry of the failing stage could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transfer(_) | Self::ChecksumMismatch { .. })
    }
}

pub type Result<T> = std::result::Result<T, UpdaterError>;
