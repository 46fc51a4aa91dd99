//! Snapshot Update System
//!
//! A checksum-verified download pipeline with a bounded retry budget.
//!
//! Components:
//! - `state` - Update phase machine and retry budget
//! - `download` - HTTP fetches with progress tracking
//! - `verify` - Checksum verification
//! - `events` - Notification channel
//! - `orchestrator` - Version check, download, verify, diff

pub mod download;
pub mod events;
pub mod orchestrator;
pub mod state;
pub mod verify;

pub use download::{FetchError, Fetcher};
pub use events::{EventSink, UpdateEvent, VersionPair};
pub use orchestrator::{UpdateCheck, Updater};
pub use state::{TransferState, UpdatePhase, UpdateState};
pub use verify::ChecksumVerifier;
