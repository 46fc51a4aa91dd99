//! Update State Machine
//!
//! Tracks the phase of an update cycle and the shared retry budget of a
//! single `download_now` call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Phase of the update process
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum UpdatePhase {
    /// Nothing in progress
    #[default]
    Idle,
    CheckingVersion,
    FetchingChecksum,
    FetchingData,
    VerifyingChecksum,
    /// A stage failed and is about to be attempted again
    Retrying,
    /// Snapshot downloaded and verified
    Done,
    Failed,
}

impl UpdatePhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Retry budget of one download cycle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransferState {
    /// Failed stage attempts so far
    pub attempts_used: u32,
    pub max_attempts: u32,
    pub expected_checksum: Option<String>,
}

impl TransferState {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            attempts_used: 0,
            max_attempts,
            expected_checksum: None,
        }
    }

    pub fn reset(&mut self) {
        self.attempts_used = 0;
        self.expected_checksum = None;
    }

    /// Budget of 0 still allows one attempt
    pub fn allowed_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Count a failed attempt; true once the budget is spent
    pub fn record_failure(&mut self) -> bool {
        self.attempts_used += 1;
        self.is_exhausted()
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts_used >= self.allowed_attempts()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateState {
    pub phase: UpdatePhase,
    pub transfer: TransferState,
    pub last_check: Option<DateTime<Utc>>,
    pub available_version: Option<String>,
    pub last_error: Option<String>,
}

impl UpdateState {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            phase: UpdatePhase::Idle,
            transfer: TransferState::new(max_attempts),
            last_check: None,
            available_version: None,
            last_error: None,
        }
    }

    pub fn start_checking(&mut self) {
        self.phase = UpdatePhase::CheckingVersion;
        self.last_check = Some(Utc::now());
    }

    pub fn finish_checking(&mut self, available_version: String) {
        self.available_version = Some(available_version);
        self.phase = UpdatePhase::Idle;
    }

    /// Begin a new download cycle with a fresh budget
    pub fn start_download(&mut self) {
        self.transfer.reset();
        self.last_error = None;
        self.phase = UpdatePhase::FetchingChecksum;
    }

    pub fn enter(&mut self, phase: UpdatePhase) {
        self.phase = phase;
    }

    pub fn mark_done(&mut self) {
        self.phase = UpdatePhase::Done;
    }

    pub fn mark_failed(&mut self, reason: String) {
        self.phase = UpdatePhase::Failed;
        self.last_error = Some(reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_default() {
        let state = UpdateState::new(3);
        assert_eq!(state.phase, UpdatePhase::Idle);
        assert_eq!(state.transfer.attempts_used, 0);
        assert!(state.available_version.is_none());
    }

    #[test]
    fn test_budget_exhaustion() {
        let mut transfer = TransferState::new(3);
        assert!(!transfer.record_failure());
        assert!(!transfer.record_failure());
        assert!(transfer.record_failure());
        assert!(transfer.is_exhausted());

        transfer.reset();
        assert_eq!(transfer.attempts_used, 0);
        assert!(!transfer.is_exhausted());
    }

    #[test]
    fn test_zero_budget_means_single_attempt() {
        let mut transfer = TransferState::new(0);
        assert_eq!(transfer.allowed_attempts(), 1);
        assert!(transfer.record_failure());
    }

    #[test]
    fn test_state_transitions() {
        let mut state = UpdateState::new(2);

        state.start_checking();
        assert_eq!(state.phase, UpdatePhase::CheckingVersion);
        assert!(state.last_check.is_some());
        state.finish_checking("v2".to_string());
        assert_eq!(state.available_version.as_deref(), Some("v2"));

        state.transfer.attempts_used = 2;
        state.start_download();
        assert_eq!(state.phase, UpdatePhase::FetchingChecksum);
        assert_eq!(state.transfer.attempts_used, 0);

        state.enter(UpdatePhase::FetchingData);
        state.enter(UpdatePhase::VerifyingChecksum);
        state.mark_done();
        assert!(state.phase.is_terminal());

        state.mark_failed("boom".to_string());
        assert_eq!(state.phase, UpdatePhase::Failed);
        assert_eq!(state.last_error.as_deref(), Some("boom"));
    }
}
