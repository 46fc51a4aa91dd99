//! Snapshot Diff Engine
//!
//! Compares two snapshot generations table by table and reports which rows
//! were added or removed, keyed by each table's configured key column.
//!
//! Two behaviours are kept on purpose for report compatibility:
//! - Unless [`DiffOptions::strict`] is set, a table whose row count is equal
//!   in both snapshots is skipped, so same-count changes go unreported.
//! - A sample list accepts an entry while its length is `<= max_sample_items`,
//!   so it holds at most `max_sample_items + 1` entries.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::engine::snapshot::{
    render_value, ScannedRow, Snapshot, SnapshotError, SnapshotSchema, TableSpec, VersionInfo,
};

pub const DEFAULT_MAX_SAMPLE_ITEMS: usize = 10;
pub const SAMPLE_DELIMITER: &str = ",";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffOptions {
    pub max_sample_items: usize,
    /// Row-compare every table, not only those whose counts differ
    pub strict: bool,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            max_sample_items: DEFAULT_MAX_SAMPLE_ITEMS,
            strict: false,
        }
    }
}

/// Added or removed rows of one table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub count: u64,
    pub sample: Vec<String>,
}

impl ChangeSet {
    fn record(&mut self, spec: &TableSpec, row: &ScannedRow<'_>, max_sample_items: usize) {
        self.count += 1;
        if self.sample.len() > max_sample_items || spec.report_columns.is_empty() {
            return;
        }
        let entry = spec
            .report_columns
            .iter()
            .map(|column| row.get(column).map(render_value).unwrap_or_default())
            .collect::<Vec<_>>()
            .join(SAMPLE_DELIMITER);
        self.sample.push(entry);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDiff {
    pub table: String,
    pub current_count: u64,
    pub next_count: u64,
    pub added: ChangeSet,
    pub removed: ChangeSet,
}

impl TableDiff {
    /// Signed row count difference, next minus current
    pub fn delta(&self) -> i64 {
        self.next_count as i64 - self.current_count as i64
    }

    pub fn changes(&self) -> u64 {
        self.added.count + self.removed.count
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffReport {
    pub current_version: VersionInfo,
    pub next_version: VersionInfo,
    /// Changed tables only, in configured order
    pub tables: IndexMap<String, TableDiff>,
}

impl DiffReport {
    pub fn table(&self, name: &str) -> Option<&TableDiff> {
        self.tables.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Compares two open snapshots under a fixed schema
pub struct SnapshotDiffEngine<'a> {
    schema: &'a SnapshotSchema,
    options: DiffOptions,
}

impl<'a> SnapshotDiffEngine<'a> {
    pub fn new(schema: &'a SnapshotSchema, options: DiffOptions) -> Self {
        Self { schema, options }
    }

    pub fn diff(&self, current: &Snapshot, next: &Snapshot) -> Result<DiffReport, SnapshotError> {
        self.diff_with_progress(current, next, |_| {})
    }

    /// Run the diff, calling `on_table` before each table is row-compared
    pub fn diff_with_progress<F>(
        &self,
        current: &Snapshot,
        next: &Snapshot,
        mut on_table: F,
    ) -> Result<DiffReport, SnapshotError>
    where
        F: FnMut(&str),
    {
        let current_version = current.version_info(&self.schema.metadata_table)?;
        let next_version = next.version_info(&self.schema.metadata_table)?;

        let mut counts = Vec::with_capacity(self.schema.tables.len());
        for spec in &self.schema.tables {
            counts.push((spec, current.row_count(&spec.name)?, next.row_count(&spec.name)?));
        }

        let mut tables = IndexMap::new();
        for (spec, current_count, next_count) in counts {
            if current_count == next_count && !self.options.strict {
                continue;
            }

            on_table(&spec.name);
            debug!(table = %spec.name, current_count, next_count, "diffing table");

            let removed = self.changed_rows(spec, current, next)?;
            let added = self.changed_rows(spec, next, current)?;

            if self.options.strict && added.count == 0 && removed.count == 0 {
                continue;
            }

            info!(
                table = %spec.name,
                added = added.count,
                removed = removed.count,
                "table changed"
            );
            tables.insert(
                spec.name.clone(),
                TableDiff {
                    table: spec.name.clone(),
                    current_count,
                    next_count,
                    added,
                    removed,
                },
            );
        }

        Ok(DiffReport {
            current_version,
            next_version,
            tables,
        })
    }

    /// Rows of `from` whose key has no match in `other`
    fn changed_rows(
        &self,
        spec: &TableSpec,
        from: &Snapshot,
        other: &Snapshot,
    ) -> Result<ChangeSet, SnapshotError> {
        let mut changes = ChangeSet::default();
        from.scan(&spec.name, |row| {
            let key = row.get(&spec.key_column).ok_or_else(|| SnapshotError::UnknownColumn {
                table: spec.name.clone(),
                column: spec.key_column.clone(),
            })?;
            if !other.contains_key(&spec.name, &spec.key_column, key)? {
                changes.record(spec, row, self.options.max_sample_items);
            }
            Ok(())
        })?;
        Ok(changes)
    }
}

/// Diff two snapshots with the given schema and options
pub fn diff(
    current: &Snapshot,
    next: &Snapshot,
    schema: &SnapshotSchema,
    options: DiffOptions,
) -> Result<DiffReport, SnapshotError> {
    SnapshotDiffEngine::new(schema, options).diff(current, next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = DiffOptions::default();
        assert_eq!(options.max_sample_items, 10);
        assert!(!options.strict);
    }

    #[test]
    fn test_table_diff_delta() {
        let diff = TableDiff {
            table: "t".to_string(),
            current_count: 10,
            next_count: 7,
            added: ChangeSet { count: 1, sample: vec![] },
            removed: ChangeSet { count: 4, sample: vec![] },
        };
        assert_eq!(diff.delta(), -3);
        assert_eq!(diff.changes(), 5);
    }
}
