//! Snapshot Updater - keeps a local snapshot database in sync with a
//! published dataset and reports what changed between generations.

pub mod engine;
