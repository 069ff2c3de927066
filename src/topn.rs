//! Top-N collapsing: keep the N highest-ranked categories, fold the rest
//! into a single "Other" category.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::aggregate::{reduce_rows, ReducerMap};
use crate::error::Result;
use crate::snapshot::{self, Row};
use crate::value::Value;

pub const OTHER_LABEL: &str = "Other";

#[derive(Debug, Clone, PartialEq)]
pub struct TopN {
    pub n: usize,
    pub category: String,
    pub rank_by: String,
    /// Reducers applied when several rows share a (date, label) after
    /// relabelling. Columns not listed are dropped.
    pub measures: ReducerMap,
}

impl TopN {
    pub fn new(n: usize, category: &str, rank_by: &str, measures: ReducerMap) -> Self {
        Self {
            n,
            category: category.to_string(),
            rank_by: rank_by.to_string(),
            measures,
        }
    }
}

/// Collapse within each date. Output is ordered by date, then retained
/// labels in rank order, then "Other".
pub fn collapse_per_bucket(rows: &[Row], date_column: &str, spec: &TopN) -> Result<Vec<Row>> {
    let mut by_date: BTreeMap<NaiveDate, (Value, Vec<&Row>)> = BTreeMap::new();
    for row in rows {
        let date = snapshot::date(row, date_column)?;
        let date_value = snapshot::cell(row, date_column)?.clone();
        by_date
            .entry(date)
            .or_insert_with(|| (date_value, Vec::new()))
            .1
            .push(row);
    }

    let mut out = Vec::new();
    for (_, (date_value, members)) in by_date {
        for mut collapsed in collapse_group(&members, spec)? {
            collapsed.insert(date_column.to_string(), date_value.clone());
            out.push(collapsed);
        }
    }
    Ok(out)
}

/// Collapse an un-dated breakdown (e.g. an overview table) once.
pub fn collapse_overall(rows: &[Row], spec: &TopN) -> Result<Vec<Row>> {
    let members: Vec<&Row> = rows.iter().collect();
    collapse_group(&members, spec)
}

/// The `n` highest-ranked rows, unchanged, with no "Other" row.
pub fn head_n(rows: &[Row], rank_by: &str, n: usize) -> Result<Vec<Row>> {
    let members: Vec<&Row> = rows.iter().collect();
    let order = rank(&members, rank_by)?;
    Ok(order.into_iter().take(n).map(|i| members[i].clone()).collect())
}

/// Indices of `members` best-first. The sort is stable, so equal metrics
/// keep their input order; missing metrics rank last.
fn rank(members: &[&Row], rank_by: &str) -> Result<Vec<usize>> {
    let metrics = members
        .iter()
        .map(|row| snapshot::number(row, rank_by))
        .collect::<Result<Vec<Option<f64>>>>()?;
    let mut order: Vec<usize> = (0..members.len()).collect();
    order.sort_by(|&a, &b| match (metrics[a], metrics[b]) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    Ok(order)
}

fn collapse_group(members: &[&Row], spec: &TopN) -> Result<Vec<Row>> {
    let order = rank(members, &spec.rank_by)?;

    // Labels in output order with their member rows.
    let mut groups: Vec<(String, Vec<&Row>)> = Vec::new();
    let mut other: Vec<&Row> = Vec::new();
    for idx in order {
        let row = members[idx];
        let label = snapshot::cell(row, &spec.category)?.label();
        if label == OTHER_LABEL {
            other.push(row);
            continue;
        }
        // N counts distinct labels, not rows.
        let room = groups.len() < spec.n;
        match groups.iter_mut().find(|(l, _)| *l == label) {
            Some((_, rows)) => rows.push(row),
            None if room => groups.push((label, vec![row])),
            None => other.push(row),
        }
    }
    if !other.is_empty() {
        groups.push((OTHER_LABEL.to_string(), other));
    }

    let mut out = Vec::with_capacity(groups.len());
    for (label, rows) in groups {
        let mut reduced = reduce_rows(rows, &spec.measures)?;
        reduced.insert(spec.category.clone(), Value::Text(label));
        out.push(reduced);
    }
    Ok(out)
}
