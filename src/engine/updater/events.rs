//! Update notifications
//!
//! Events are pushed through a channel registered on the updater; there is
//! no process-wide emitter.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use super::state::UpdatePhase;
use crate::engine::diff::DiffReport;

/// Current and remote version tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionPair {
    pub current: String,
    pub available: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum UpdateEvent {
    StateChanged { phase: UpdatePhase },
    NeedUpdate { needs_update: bool, versions: VersionPair },
    Downloading { percent: u8 },
    Downloaded,
    Diffing { table: String },
    DiffDone { report: Box<DiffReport> },
    Error { message: String },
}

/// Optional sending half handed to the updater
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<UnboundedSender<UpdateEvent>>,
}

impl EventSink {
    pub fn new(tx: UnboundedSender<UpdateEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Sink plus the receiver to consume it
    pub fn channel() -> (Self, UnboundedReceiver<UpdateEvent>) {
        let (tx, rx) = unbounded_channel();
        (Self::new(tx), rx)
    }

    /// Delivery is best effort; a dropped receiver is not an error
    pub fn emit(&self, event: UpdateEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}
