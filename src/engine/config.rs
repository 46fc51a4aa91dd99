//! Updater Configuration Module
//! Handles loading and validating updater config files

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
    #[error("Failed to read config: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Invalid config format: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("{0} option is mandatory")]
    MissingOption(&'static str),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdaterConfig {
    /// Subscription key, used as a path segment of every remote URL
    #[serde(default)]
    pub subscription_key: Option<String>,
    /// Snapshot currently in use
    #[serde(default)]
    pub current_database: Option<PathBuf>,
    /// Where the downloaded candidate snapshot is written
    #[serde(default)]
    pub next_database: Option<PathBuf>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_remote_filename")]
    pub remote_filename: String,
    #[serde(default = "default_remote_checksum_filename")]
    pub remote_checksum_filename: String,
    /// Total attempts per download cycle; 0 behaves like 1
    #[serde(default = "default_max_retry_attempts")]
    pub max_retry_attempts: u32,
    #[serde(default)]
    pub retry_delay_ms: u64,
}

fn default_base_url() -> String {
    "http://data.udger.com/".to_string()
}

fn default_remote_filename() -> String {
    "udgerdb_v3.dat".to_string()
}

fn default_remote_checksum_filename() -> String {
    "udgerdb_v3.dat.sha256".to_string()
}

fn default_max_retry_attempts() -> u32 {
    3
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            subscription_key: None,
            current_database: None,
            next_database: None,
            base_url: default_base_url(),
            remote_filename: default_remote_filename(),
            remote_checksum_filename: default_remote_checksum_filename(),
            max_retry_attempts: default_max_retry_attempts(),
            retry_delay_ms: 0,
        }
    }
}

/// Endpoints derived from a validated config
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteUrls {
    pub version: String,
    pub checksum: String,
    pub data: String,
}

impl UpdaterConfig {
    pub fn new(subscription_key: impl Into<String>, current_database: impl Into<PathBuf>) -> Self {
        Self {
            subscription_key: Some(subscription_key.into()),
            current_database: Some(current_database.into()),
            ..Self::default()
        }
    }

    pub fn load(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::NotFound(config_path.to_path_buf()));
        }
        let content = std::fs::read_to_string(config_path)?;
        let config: UpdaterConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self, config_path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    /// Check mandatory options. Empty strings count as missing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.subscription_key.as_deref().map_or(true, str::is_empty) {
            return Err(ConfigError::MissingOption("subscriptionKey"));
        }
        let current_missing = self
            .current_database
            .as_ref()
            .map_or(true, |p| p.as_os_str().is_empty());
        if current_missing {
            return Err(ConfigError::MissingOption("currentDatabase"));
        }
        Ok(())
    }

    pub fn remote_urls(&self) -> Result<RemoteUrls, ConfigError> {
        let key = self
            .subscription_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingOption("subscriptionKey"))?;

        let mut base = self.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }

        Ok(RemoteUrls {
            version: format!("{}{}/version", base, key),
            checksum: format!("{}{}/{}", base, key, self.remote_checksum_filename),
            data: format!("{}{}/{}", base, key, self.remote_filename),
        })
    }

    /// Resolve the next snapshot path, picking a fresh temp file when unset
    pub fn resolve_next_database(&self) -> PathBuf {
        match &self.next_database {
            Some(path) if !path.as_os_str().is_empty() => path.clone(),
            _ => std::env::temp_dir().join(format!("snapshot-{}.dat", uuid::Uuid::new_v4())),
        }
    }
}
