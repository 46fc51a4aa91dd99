//! Table specs: which tables are compared, by which key, and which columns
//! make up a human-readable change sample.

use serde::{Deserialize, Serialize};

pub const DEFAULT_KEY_COLUMN: &str = "id";
pub const DEFAULT_METADATA_TABLE: &str = "udger_db_info";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSpec {
    pub name: String,
    pub key_column: String,
    /// Empty means counts only, no samples
    #[serde(default)]
    pub report_columns: Vec<String>,
}

impl TableSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            key_column: DEFAULT_KEY_COLUMN.to_string(),
            report_columns: Vec::new(),
        }
    }

    pub fn key(mut self, column: &str) -> Self {
        self.key_column = column.to_string();
        self
    }

    pub fn report(mut self, columns: &[&str]) -> Self {
        self.report_columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }
}

/// Fixed, ordered table list of a snapshot family
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSchema {
    pub metadata_table: String,
    pub tables: Vec<TableSpec>,
}

impl SnapshotSchema {
    pub fn new(metadata_table: &str, tables: Vec<TableSpec>) -> Self {
        Self {
            metadata_table: metadata_table.to_string(),
            tables,
        }
    }

    pub fn table(&self, name: &str) -> Option<&TableSpec> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// The udger v3 database layout
    pub fn udger() -> Self {
        let tables = vec![
            TableSpec::new("udger_client_class").report(&["client_classification"]),
            TableSpec::new("udger_client_list").report(&["name"]),
            TableSpec::new("udger_client_regex").key("regstring").report(&["regstring"]),
            TableSpec::new("udger_client_regex_words").report(&["word"]),
            TableSpec::new("udger_crawler_class").report(&["crawler_classification"]),
            TableSpec::new("udger_crawler_list").report(&["ua_string"]),
            TableSpec::new("udger_datacenter_list").report(&["name"]),
            TableSpec::new("udger_datacenter_range")
                .key("datacenter_id")
                .report(&["ip_from", "ip_to"]),
            TableSpec::new("udger_datacenter_range6")
                .key("datacenter_id")
                .report(&["ip_from", "ip_to"]),
            TableSpec::new("udger_deviceclass_list").report(&["name"]),
            TableSpec::new("udger_deviceclass_regex").key("regstring").report(&["regstring"]),
            TableSpec::new("udger_deviceclass_regex_words").report(&["word"]),
            TableSpec::new("udger_devicename_brand").report(&["brand_code"]),
            TableSpec::new("udger_devicename_list").key("code").report(&["marketname"]),
            TableSpec::new("udger_devicename_regex").report(&["regstring"]),
            TableSpec::new("udger_fragment_regex").report(&["regstring1"]),
            TableSpec::new("udger_ip_class").report(&["ip_classification"]),
            TableSpec::new("udger_ip_list").key("ip").report(&["ip"]),
            TableSpec::new("udger_os_list").report(&["name"]),
            TableSpec::new("udger_os_regex").key("os_id").report(&["regstring"]),
            TableSpec::new("udger_os_regex_words").report(&["word"]),
        ];
        Self::new(DEFAULT_METADATA_TABLE, tables)
    }
}

impl Default for SnapshotSchema {
    fn default() -> Self {
        Self::udger()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_key_is_id() {
        let spec = TableSpec::new("t");
        assert_eq!(spec.key_column, "id");
        assert!(spec.report_columns.is_empty());
    }

    #[test]
    fn test_udger_overrides() {
        let schema = SnapshotSchema::udger();
        assert_eq!(schema.tables.len(), 21);
        assert_eq!(schema.table("udger_ip_list").unwrap().key_column, "ip");
        assert_eq!(schema.table("udger_os_regex").unwrap().key_column, "os_id");
        assert_eq!(schema.table("udger_client_list").unwrap().key_column, "id");
        assert_eq!(
            schema.table("udger_datacenter_range6").unwrap().report_columns,
            vec!["ip_from", "ip_to"]
        );
        assert!(schema.table("udger_client_os_relation").is_none());
    }
}
