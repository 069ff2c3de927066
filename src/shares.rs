//! Percentage shares of a total.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::Result;
use crate::snapshot::{self, Row};
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Share {
    pub label: String,
    pub value: f64,
    /// 0..=100; zero everywhere when the total is zero.
    pub percent: f64,
}

/// One share per row, in row order. Null values count as zero.
pub fn shares(rows: &[Row], category: &str, value: &str) -> Result<Vec<Share>> {
    let mut items = Vec::with_capacity(rows.len());
    for row in rows {
        let label = snapshot::cell(row, category)?.label();
        let v = snapshot::number(row, value)?.unwrap_or(0.0);
        items.push((label, v));
    }
    let total: f64 = items.iter().map(|(_, v)| v).sum();
    Ok(items
        .into_iter()
        .map(|(label, v)| Share {
            label,
            value: v,
            percent: percent_of(v, total),
        })
        .collect())
}

/// Replace `value` with its percentage of the per-date total, as used by
/// 100%-stacked area charts.
pub fn normalize_per_bucket(rows: &[Row], date_column: &str, value: &str) -> Result<Vec<Row>> {
    let mut totals: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for row in rows {
        let date = snapshot::date(row, date_column)?;
        let v = snapshot::number(row, value)?.unwrap_or(0.0);
        *totals.entry(date).or_insert(0.0) += v;
    }
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let date = snapshot::date(row, date_column)?;
        let v = snapshot::number(row, value)?.unwrap_or(0.0);
        let total = totals.get(&date).copied().unwrap_or(0.0);
        let mut normalized = row.clone();
        normalized.insert(value.to_string(), Value::Number(percent_of(v, total)));
        out.push(normalized);
    }
    Ok(out)
}

fn percent_of(v: f64, total: f64) -> f64 {
    if total == 0.0 {
        0.0
    } else {
        v / total * 100.0
    }
}
