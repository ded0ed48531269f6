//! Source records: one row of the legacy CMS export per dataset to migrate.

use std::collections::BTreeMap;
use std::path::Path;

use crate::config::RecordSelection;
use crate::error::{MetadataError, SourceError};

/// Column holding the packed per-file sub-fields. The header is taken
/// verbatim from the legacy export.
pub const COMPONENT_FILES_COLUMN: &str =
    "COMPONENT_FILES-location$topic$url$data_level$private$doi$metadata_url";

/// One raw row of the legacy export: column name → stringified value.
/// Immutable input; one per migration attempt.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceRecord {
    fields: BTreeMap<String, String>,
}

impl SourceRecord {
    pub fn new(fields: BTreeMap<String, String>) -> Self {
        Self { fields }
    }

    /// The legacy record id (`czo_id` column).
    pub fn source_id(&self) -> Option<&str> {
        self.get("czo_id")
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }

    /// Required string field; empty values are accepted, absent columns are not.
    pub fn required(&self, column: &str) -> Result<&str, MetadataError> {
        self.get(column)
            .ok_or_else(|| MetadataError::FieldMissing(column.to_string()))
    }

    /// Optional field normalized so that a blank value reads as `None`.
    pub fn non_blank(&self, column: &str) -> Option<&str> {
        self.get(column).map(str::trim).filter(|v| !v.is_empty())
    }

    /// Required numeric field (coordinates, sizes).
    pub fn required_f64(&self, column: &str) -> Result<f64, MetadataError> {
        let raw = self.required(column)?;
        raw.trim()
            .parse::<f64>()
            .map_err(|e| MetadataError::FieldFormat {
                field: column.to_string(),
                value: raw.to_string(),
                reason: e.to_string(),
            })
    }
}

impl FromIterator<(String, String)> for SourceRecord {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// Supplies source records in a stable order. CSV parsing itself is out of
/// scope; the shipped provider reads the JSON export of the legacy CMS.
pub trait RecordProvider {
    fn records(&self) -> Result<Vec<SourceRecord>, SourceError>;
}

/// Reads a JSON array of flat objects. Non-string scalar values are
/// stringified on load so downstream code sees a uniform string map.
pub struct JsonRecordProvider {
    path: std::path::PathBuf,
}

impl JsonRecordProvider {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl RecordProvider for JsonRecordProvider {
    fn records(&self) -> Result<Vec<SourceRecord>, SourceError> {
        let content =
            std::fs::read_to_string(&self.path).map_err(|e| SourceError::ReadFile {
                path: self.path.clone(),
                source: e,
            })?;
        records_from_str(&content)
    }
}

pub fn records_from_str(content: &str) -> Result<Vec<SourceRecord>, SourceError> {
    let rows: Vec<serde_json::Value> = serde_json::from_str(content)?;

    let mut records = Vec::with_capacity(rows.len());
    for (row, value) in rows.into_iter().enumerate() {
        let obj = match value {
            serde_json::Value::Object(obj) => obj,
            _ => return Err(SourceError::InvalidRow { row }),
        };
        let record = obj
            .into_iter()
            .map(|(k, v)| (k, stringify(v)))
            .collect::<SourceRecord>();
        records.push(record);
    }
    Ok(records)
}

fn stringify(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Applies the configured row selection on top of the provider's stable order.
pub fn select_records(records: Vec<SourceRecord>, selection: &RecordSelection) -> Vec<SourceRecord> {
    match selection {
        RecordSelection::All => records,
        RecordSelection::FirstN(n) => records.into_iter().take(*n).collect(),
        RecordSelection::Ids(ids) => records
            .into_iter()
            .filter(|r| {
                r.source_id()
                    .map(|id| ids.iter().any(|want| want == id))
                    .unwrap_or(false)
            })
            .collect(),
    }
}
