//! Update Orchestrator
//!
//! Drives version check, checksum fetch, data fetch and verification for one
//! subscription, then diffs the downloaded snapshot against the current one.
//!
//! Within one `download_now` call every failed stage attempt (transfer error
//! or checksum mismatch) draws from the same budget of
//! `max(max_retry_attempts, 1)` attempts. Only the failing stage is repeated.
//! A 404 from the checksum or data endpoint is terminal.

use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::download::{FetchError, Fetcher};
use super::events::{EventSink, UpdateEvent, VersionPair};
use super::state::{UpdatePhase, UpdateState};
use super::verify::{ChecksumVerifier, VerifyError};
use crate::engine::config::{ConfigError, RemoteUrls, UpdaterConfig};
use crate::engine::diff::{DiffOptions, DiffReport, SnapshotDiffEngine};
use crate::engine::error::{Result, UpdaterError};
use crate::engine::snapshot::{Snapshot, SnapshotSchema, VersionInfo};

/// Outcome of a version check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCheck {
    pub needs_update: bool,
    pub versions: VersionPair,
}

pub struct Updater {
    urls: RemoteUrls,
    schema: SnapshotSchema,
    current_path: PathBuf,
    next_path: PathBuf,
    current_version: VersionInfo,
    retry_delay: Duration,
    fetcher: Fetcher,
    events: EventSink,
    state: UpdateState,
}

impl Updater {
    /// Validate `config` and read the current snapshot's version
    pub fn new(config: UpdaterConfig) -> Result<Self> {
        Self::with_schema(config, SnapshotSchema::default())
    }

    pub fn with_schema(config: UpdaterConfig, schema: SnapshotSchema) -> Result<Self> {
        config.validate()?;
        let urls = config.remote_urls()?;

        let current_path = config
            .current_database
            .clone()
            .ok_or(ConfigError::MissingOption("currentDatabase"))?;
        let current_version = Snapshot::open(&current_path)?.version_info(&schema.metadata_table)?;
        let next_path = config.resolve_next_database();

        debug!(
            current = %current_path.display(),
            next = %next_path.display(),
            version = %current_version.version,
            "updater ready"
        );

        Ok(Self {
            urls,
            schema,
            current_path,
            next_path,
            current_version,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            fetcher: Fetcher::new(),
            events: EventSink::default(),
            state: UpdateState::new(config.max_retry_attempts),
        })
    }

    /// Register where notifications go
    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    pub fn with_fetcher(mut self, fetcher: Fetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn current_version(&self) -> &VersionInfo {
        &self.current_version
    }

    pub fn current_database(&self) -> &Path {
        &self.current_path
    }

    pub fn next_database(&self) -> &Path {
        &self.next_path
    }

    pub fn urls(&self) -> &RemoteUrls {
        &self.urls
    }

    pub fn state(&self) -> &UpdateState {
        &self.state
    }

    fn set_phase(&mut self, phase: UpdatePhase) {
        self.state.enter(phase);
        self.events.emit(UpdateEvent::StateChanged { phase });
    }

    fn fail(&mut self, err: UpdaterError) -> UpdaterError {
        let message = err.to_string();
        error!(%message, "update failed");
        self.state.mark_failed(message.clone());
        self.events.emit(UpdateEvent::StateChanged {
            phase: UpdatePhase::Failed,
        });
        self.events.emit(UpdateEvent::Error { message });
        err
    }

    fn bad_credential(&mut self, url: String) -> UpdaterError {
        self.state.transfer.reset();
        self.fail(UpdaterError::BadCredential { url })
    }

    /// Spend one attempt; errors once the budget is gone
    async fn retry_or_fail(&mut self, url: &str, cause: UpdaterError) -> Result<()> {
        let exhausted = self.state.transfer.record_failure();
        let attempts = self.state.transfer.attempts_used;

        if exhausted {
            return Err(self.fail(UpdaterError::RetriesExhausted {
                url: url.to_string(),
                attempts,
                source: Box::new(cause),
            }));
        }

        warn!(
            url,
            attempt = attempts,
            max = self.state.transfer.allowed_attempts(),
            cause = %cause,
            "retrying"
        );
        self.set_phase(UpdatePhase::Retrying);
        if !self.retry_delay.is_zero() {
            tokio::time::sleep(self.retry_delay).await;
        }
        Ok(())
    }

    /// Ask the remote which version is published and compare it with ours
    pub async fn check_for_update(&mut self) -> Result<UpdateCheck> {
        self.state.start_checking();
        self.events.emit(UpdateEvent::StateChanged {
            phase: UpdatePhase::CheckingVersion,
        });
        info!(url = %self.urls.version, "checking for update");

        let body = match self.fetcher.fetch_text(&self.urls.version).await {
            Ok(body) => body,
            Err(e) => return Err(self.fail(UpdaterError::Network(e))),
        };

        let available = body.trim().to_string();
        let versions = VersionPair {
            current: self.current_version.version.clone(),
            available: available.clone(),
        };
        let needs_update = versions.available != versions.current;
        info!(current = %versions.current, available = %versions.available, needs_update, "version checked");

        self.events.emit(UpdateEvent::NeedUpdate {
            needs_update,
            versions: versions.clone(),
        });
        self.state.finish_checking(available);
        self.events.emit(UpdateEvent::StateChanged {
            phase: UpdatePhase::Idle,
        });

        Ok(UpdateCheck {
            needs_update,
            versions,
        })
    }

    /// Check, then download only when the remote version differs
    ///
    /// Returns whether a new snapshot was downloaded.
    pub async fn download(&mut self) -> Result<bool> {
        let check = self.check_for_update().await?;
        if !check.needs_update {
            return Ok(false);
        }
        self.download_now().await?;
        Ok(true)
    }

    /// Fetch checksum and data unconditionally, verifying the result
    pub async fn download_now(&mut self) -> Result<()> {
        self.state.start_download();

        let expected = self.fetch_checksum().await?;
        self.fetch_verified_data(&expected).await?;

        info!(path = %self.next_path.display(), "snapshot downloaded and verified");
        self.state.mark_done();
        self.events.emit(UpdateEvent::StateChanged {
            phase: UpdatePhase::Done,
        });
        self.events.emit(UpdateEvent::Downloaded);
        Ok(())
    }

    async fn fetch_checksum(&mut self) -> Result<String> {
        let url = self.urls.checksum.clone();
        loop {
            self.set_phase(UpdatePhase::FetchingChecksum);
            match self.fetcher.fetch_text(&url).await {
                Ok(body) => {
                    let expected = parse_checksum(&body);
                    debug!(%expected, "expected checksum");
                    self.state.transfer.expected_checksum = Some(expected.clone());
                    return Ok(expected);
                }
                Err(FetchError::NotFound { .. }) => return Err(self.bad_credential(url)),
                Err(FetchError::Io { path, source }) => {
                    return Err(self.fail(UpdaterError::Io { path, source }))
                }
                Err(e) => self.retry_or_fail(&url, UpdaterError::Transfer(e)).await?,
            }
        }
    }

    async fn fetch_verified_data(&mut self, expected: &str) -> Result<()> {
        let url = self.urls.data.clone();
        let dest = self.next_path.clone();
        loop {
            self.set_phase(UpdatePhase::FetchingData);

            let events = self.events.clone();
            let fetched = self
                .fetcher
                .fetch_to_file(&url, &dest, |percent| {
                    debug!(percent, "downloading");
                    events.emit(UpdateEvent::Downloading { percent });
                })
                .await;

            match fetched {
                Ok(result) => debug!(bytes = result.bytes_downloaded, "data fetched"),
                Err(FetchError::NotFound { .. }) => return Err(self.bad_credential(url)),
                Err(FetchError::Io { path, source }) => {
                    return Err(self.fail(UpdaterError::Io { path, source }))
                }
                Err(e) => {
                    self.retry_or_fail(&url, UpdaterError::Transfer(e)).await?;
                    continue;
                }
            }

            self.set_phase(UpdatePhase::VerifyingChecksum);
            match verify_off_runtime(&dest, expected).await {
                Ok(()) => return Ok(()),
                Err(VerifyError::Io(source)) => {
                    return Err(self.fail(UpdaterError::Io { path: dest, source }))
                }
                Err(VerifyError::ChecksumMismatch { expected, actual }) => {
                    self.retry_or_fail(&url, UpdaterError::ChecksumMismatch { expected, actual })
                        .await?
                }
            }
        }
    }

    /// Diff the current snapshot against the downloaded one
    pub fn make_diff(&self, options: DiffOptions) -> Result<DiffReport> {
        match self.run_diff(options) {
            Ok(report) => {
                self.events.emit(UpdateEvent::DiffDone {
                    report: Box::new(report.clone()),
                });
                Ok(report)
            }
            Err(e) => {
                self.events.emit(UpdateEvent::Error {
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    fn run_diff(&self, options: DiffOptions) -> Result<DiffReport> {
        let current = Snapshot::open(&self.current_path)?;
        let next = Snapshot::open(&self.next_path)?;
        info!(
            current = %current.path().display(),
            next = %next.path().display(),
            "diffing snapshots"
        );

        let engine = SnapshotDiffEngine::new(&self.schema, options);
        let report = engine.diff_with_progress(&current, &next, |table| {
            self.events.emit(UpdateEvent::Diffing {
                table: table.to_string(),
            });
        })?;
        Ok(report)
    }
}

/// Hash on the blocking pool
async fn verify_off_runtime(path: &Path, expected: &str) -> std::result::Result<(), VerifyError> {
    let path = path.to_path_buf();
    let expected = expected.to_string();
    tokio::task::spawn_blocking(move || ChecksumVerifier::ensure(&path, &expected))
        .await
        .map_err(|e| VerifyError::Io(std::io::Error::other(e)))?
}

/// First token of a checksum body; tolerates `sha256sum` style output
fn parse_checksum(body: &str) -> String {
    body.split_whitespace().next().unwrap_or_default().to_string()
}
