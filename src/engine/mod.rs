// Snapshot Updater Engine - Core module structure
pub mod cli;
pub mod config;
pub mod diff;
pub mod error;
pub mod report;
pub mod snapshot;
pub mod updater;

pub use config::UpdaterConfig;
pub use diff::{DiffOptions, DiffReport, SnapshotDiffEngine, TableDiff};
pub use error::UpdaterError;
pub use snapshot::{Snapshot, SnapshotSchema, TableSpec, VersionInfo};
pub use updater::Updater;
