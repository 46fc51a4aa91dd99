//! Snapshot Store
//!
//! Read-only access to a versioned SQLite snapshot file: metadata, row counts,
//! full scans and point lookups by an arbitrary key column.

pub mod schema;

pub use schema::{SnapshotSchema, TableSpec};

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Snapshot file not found: {0}")]
    NotFound(PathBuf),
    #[error("Failed to open snapshot {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Metadata table {0} has no rows")]
    MissingMetadata(String),
    #[error("Column {column} not found in table {table}")]
    UnknownColumn { table: String, column: String },
    #[error("Invalid lastupdate in {table}: {value}")]
    InvalidLastUpdate { table: String, value: String },
}

/// Version stamp of one snapshot generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    pub version: String,
    pub last_update: DateTime<Utc>,
}

/// One row produced by a full table scan
pub struct ScannedRow<'a> {
    columns: &'a [String],
    values: Vec<Value>,
}

impl ScannedRow<'_> {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|idx| &self.values[idx])
    }
}

/// An open, read-only snapshot
pub struct Snapshot {
    conn: Connection,
    path: PathBuf,
}

impl Snapshot {
    /// Open an existing snapshot file read-only
    pub fn open(path: &Path) -> Result<Self, SnapshotError> {
        if !path.is_file() {
            return Err(SnapshotError::NotFound(path.to_path_buf()));
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|source| SnapshotError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the single metadata row (`version`, `lastupdate`)
    ///
    /// `lastupdate` is epoch seconds, stored as a number or numeric text. A
    /// NULL stamp reads as the epoch; anything else unparsable is an error.
    pub fn version_info(&self, metadata_table: &str) -> Result<VersionInfo, SnapshotError> {
        let sql = format!(
            "SELECT version, lastupdate FROM {} LIMIT 1",
            quote_ident(metadata_table)
        );
        let row = self
            .conn
            .query_row(&sql, [], |row| {
                Ok((row.get::<_, Value>(0)?, row.get::<_, Value>(1)?))
            })
            .optional()?;

        let (version, last_update) =
            row.ok_or_else(|| SnapshotError::MissingMetadata(metadata_table.to_string()))?;

        let invalid = |value: &Value| SnapshotError::InvalidLastUpdate {
            table: metadata_table.to_string(),
            value: render_value(value),
        };
        let seconds = match &last_update {
            Value::Null => 0,
            Value::Integer(secs) => *secs,
            Value::Real(secs) => *secs as i64,
            Value::Text(text) => text.trim().parse::<i64>().map_err(|_| invalid(&last_update))?,
            Value::Blob(_) => return Err(invalid(&last_update)),
        };
        let last_update =
            DateTime::<Utc>::from_timestamp(seconds, 0).ok_or_else(|| invalid(&last_update))?;

        Ok(VersionInfo {
            version: render_value(&version),
            last_update,
        })
    }

    pub fn row_count(&self, table: &str) -> Result<u64, SnapshotError> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    /// Stream every row of `table` in the store's natural order
    pub fn scan<F>(&self, table: &str, mut on_row: F) -> Result<(), SnapshotError>
    where
        F: FnMut(&ScannedRow<'_>) -> Result<(), SnapshotError>,
    {
        let sql = format!("SELECT * FROM {}", quote_ident(table));
        let mut stmt = self.conn.prepare(&sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let values = (0..columns.len())
                .map(|idx| row.get::<_, Value>(idx))
                .collect::<Result<Vec<_>, _>>()?;
            on_row(&ScannedRow {
                columns: &columns,
                values,
            })?;
        }
        Ok(())
    }

    /// Point lookup: does any row of `table` have `column = key`?
    ///
    /// A NULL key never matches.
    pub fn contains_key(&self, table: &str, column: &str, key: &Value) -> Result<bool, SnapshotError> {
        let sql = format!(
            "SELECT 1 FROM {} WHERE {} = ?1 LIMIT 1",
            quote_ident(table),
            quote_ident(column)
        );
        let mut stmt = self.conn.prepare_cached(&sql)?;
        Ok(stmt.exists([key])?)
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Render a cell for human-readable samples
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Integer(i) => i.to_string(),
        Value::Real(r) => r.to_string(),
        Value::Text(t) => t.clone(),
        Value::Blob(b) => hex::encode(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn fixture(path: &Path) {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch(
            "CREATE TABLE info (version TEXT, lastupdate INTEGER);
             INSERT INTO info VALUES ('20240101-01', 1704067200);
             CREATE TABLE items (id INTEGER PRIMARY KEY, name TEXT, tag BLOB);
             INSERT INTO items VALUES (1, 'alpha', x'0aff');
             INSERT INTO items VALUES (2, NULL, NULL);",
        )
        .unwrap();
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempdir().unwrap();
        let result = Snapshot::open(&dir.path().join("nope.dat"));
        assert!(matches!(result, Err(SnapshotError::NotFound(_))));
    }

    #[test]
    fn test_version_info() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snap.dat");
        fixture(&path);

        let snapshot = Snapshot::open(&path).unwrap();
        let info = snapshot.version_info("info").unwrap();
        assert_eq!(info.version, "20240101-01");
        assert_eq!(info.last_update.timestamp(), 1704067200);
    }

    #[test]
    fn test_empty_metadata() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snap.dat");
        Connection::open(&path)
            .unwrap()
            .execute_batch("CREATE TABLE info (version TEXT, lastupdate INTEGER);")
            .unwrap();

        let snapshot = Snapshot::open(&path).unwrap();
        assert!(matches!(
            snapshot.version_info("info"),
            Err(SnapshotError::MissingMetadata(_))
        ));
    }

    #[test]
    fn test_text_lastupdate() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snap.dat");
        Connection::open(&path)
            .unwrap()
            .execute_batch(
                "CREATE TABLE info (version TEXT, lastupdate TEXT);
                 INSERT INTO info VALUES ('v1', ' 1704067200 ');",
            )
            .unwrap();

        let info = Snapshot::open(&path).unwrap().version_info("info").unwrap();
        assert_eq!(info.last_update.timestamp(), 1704067200);
    }

    #[test]
    fn test_non_numeric_lastupdate_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snap.dat");
        Connection::open(&path)
            .unwrap()
            .execute_batch(
                "CREATE TABLE info (version TEXT, lastupdate TEXT);
                 INSERT INTO info VALUES ('v1', 'yesterday');",
            )
            .unwrap();

        let result = Snapshot::open(&path).unwrap().version_info("info");
        match result {
            Err(SnapshotError::InvalidLastUpdate { table, value }) => {
                assert_eq!(table, "info");
                assert_eq!(value, "yesterday");
            }
            other => panic!("expected InvalidLastUpdate, got {:?}", other.map(|i| i.version)),
        }
    }

    #[test]
    fn test_count_scan_and_lookup() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snap.dat");
        fixture(&path);
        let snapshot = Snapshot::open(&path).unwrap();

        assert_eq!(snapshot.row_count("items").unwrap(), 2);

        let mut rendered = Vec::new();
        snapshot
            .scan("items", |row| {
                rendered.push(format!(
                    "{}|{}|{}",
                    render_value(row.get("id").unwrap()),
                    render_value(row.get("name").unwrap()),
                    render_value(row.get("tag").unwrap()),
                ));
                Ok(())
            })
            .unwrap();
        assert_eq!(rendered, vec!["1|alpha|0aff", "2||"]);

        assert!(snapshot.contains_key("items", "id", &Value::Integer(1)).unwrap());
        assert!(!snapshot.contains_key("items", "id", &Value::Integer(9)).unwrap());
        assert!(!snapshot.contains_key("items", "name", &Value::Null).unwrap());
    }

    #[test]
    fn test_snapshot_is_read_only() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snap.dat");
        fixture(&path);
        let snapshot = Snapshot::open(&path).unwrap();
        assert!(snapshot.conn.execute("DELETE FROM items", []).is_err());
    }
}
