//! Snapshots: immutable result tables for one query.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::catalog::QueryId;
use crate::error::{DashError, Result};
use crate::value::Value;

/// A row maps column name to value.
pub type Row = BTreeMap<String, Value>;

#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub query: QueryId,
    /// Column names in first-seen order.
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    /// Hex SHA-256 of the raw payload.
    pub digest: String,
    pub fetched_at: DateTime<Utc>,
}

impl Snapshot {
    /// Decode an upstream payload: a JSON array of flat row objects.
    pub fn from_json_bytes(query: QueryId, bytes: &[u8]) -> Result<Self> {
        let parsed: serde_json::Value = serde_json::from_slice(bytes)
            .map_err(|e| DashError::fetch(query, format!("malformed json: {}", e)))?;
        let items = match parsed {
            serde_json::Value::Array(items) => items,
            other => {
                return Err(DashError::fetch(
                    query,
                    format!("expected array of rows, got {}", json_kind(&other)),
                ))
            }
        };

        let mut columns: Vec<String> = Vec::new();
        let mut rows = Vec::with_capacity(items.len());
        for (idx, item) in items.iter().enumerate() {
            let obj = item.as_object().ok_or_else(|| {
                DashError::fetch(query, format!("row {} is {}, not an object", idx, json_kind(item)))
            })?;
            let mut row = Row::new();
            for (key, raw) in obj {
                let value = Value::from_json(raw).ok_or_else(|| {
                    DashError::fetch(query, format!("row {} column `{}` is nested", idx, key))
                })?;
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
                row.insert(key.clone(), value);
            }
            rows.push(row);
        }

        Ok(Self {
            query,
            columns,
            rows,
            digest: digest_hex(bytes),
            fetched_at: Utc::now(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Contracted columns the payload did not carry. Empty snapshots have
    /// no observable columns and report nothing.
    pub fn missing_columns(&self, expected: &[String]) -> Vec<String> {
        if self.rows.is_empty() {
            return Vec::new();
        }
        expected
            .iter()
            .filter(|c| !self.columns.contains(c))
            .cloned()
            .collect()
    }

    /// Fail with a schema error unless every named column is present.
    pub fn require_columns(&self, needed: &[&str]) -> Result<()> {
        if self.rows.is_empty() {
            return Ok(());
        }
        for col in needed {
            if !self.columns.iter().any(|c| c == col) {
                return Err(DashError::missing_column(*col).in_context(self.query.name()));
            }
        }
        Ok(())
    }

    /// First row, for single-row overview queries.
    pub fn first_row(&self) -> Result<&Row> {
        self.rows
            .first()
            .ok_or(DashError::EmptyData { query: self.query })
    }
}

/// Column value or a schema error.
pub fn cell<'a>(row: &'a Row, column: &str) -> Result<&'a Value> {
    row.get(column)
        .ok_or_else(|| DashError::missing_column(column))
}

/// Numeric column value; `None` for nulls and non-numeric text.
pub fn number(row: &Row, column: &str) -> Result<Option<f64>> {
    cell(row, column).map(Value::as_f64)
}

/// Date column value; nulls and unparseable cells are schema errors since
/// every row must land in exactly one bucket.
pub fn date(row: &Row, column: &str) -> Result<NaiveDate> {
    let value = cell(row, column)?;
    value.as_date().ok_or_else(|| DashError::Schema {
        column: column.to_string(),
        context: Some(format!("`{}` is not a date", value)),
    })
}

pub fn digest_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn json_kind(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCKS: &str = r#"[
        {"Date": "2024-01-02 00:00:00.000", "Blocks": 43200, "Transactions": 350000, "Validators": 1, "BlockTime": 2.0},
        {"Date": "2024-01-01 00:00:00.000", "Blocks": 43100, "Transactions": 340000, "Validators": 1, "BlockTime": 2.01}
    ]"#;

    #[test]
    fn test_decode_preserves_row_order() {
        let snap = Snapshot::from_json_bytes(QueryId::BlocksDaily, BLOCKS.as_bytes()).unwrap();
        assert_eq!(snap.len(), 2);
        let first = date(&snap.rows[0], "Date").unwrap();
        assert_eq!(first, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(number(&snap.rows[1], "Blocks").unwrap(), Some(43100.0));
        assert_eq!(snap.digest.len(), 64);
    }

    #[test]
    fn test_schema_contract() {
        let snap = Snapshot::from_json_bytes(QueryId::BlocksDaily, BLOCKS.as_bytes()).unwrap();
        let expected: Vec<String> = QueryId::BlocksDaily
            .columns()
            .iter()
            .map(|c| c.to_string())
            .collect();
        assert!(snap.missing_columns(&expected).is_empty());
        let err = snap.require_columns(&["Date", "TPS"]).unwrap_err();
        assert_eq!(err.kind(), "schema");
    }

    #[test]
    fn test_malformed_payloads() {
        for raw in ["not json", "{\"Date\": 1}", "[1, 2]", "[{\"a\": [1]}]"] {
            let err = Snapshot::from_json_bytes(QueryId::PricesDaily, raw.as_bytes()).unwrap_err();
            assert_eq!(err.kind(), "fetch", "{}", raw);
        }
    }

    #[test]
    fn test_empty_snapshot() {
        let snap = Snapshot::from_json_bytes(QueryId::BlocksOverview, b"[]").unwrap();
        assert!(snap.is_empty());
        assert!(snap.require_columns(&["Blocks"]).is_ok());
        assert_eq!(
            snap.first_row().unwrap_err(),
            DashError::EmptyData {
                query: QueryId::BlocksOverview
            }
        );
    }

    #[test]
    fn test_digest_stable() {
        assert_eq!(digest_hex(b"[]"), digest_hex(b"[]"));
        assert_ne!(digest_hex(b"[]"), digest_hex(b"[ ]"));
    }
}
