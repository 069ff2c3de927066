//! Time-bucket aggregation with per-column reducers.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::bucket::Granularity;
use crate::error::Result;
use crate::snapshot::{self, Row};
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Reducer {
    Sum,
    Mean,
    Min,
    Max,
    /// Mean weighted by another numeric column of the same rows. Used for
    /// rate columns (averages, per-block figures) so that recombining
    /// buckets or categories does not average averages.
    WeightedMean { weight: String },
}

impl Reducer {
    pub fn is_additive(&self) -> bool {
        matches!(self, Reducer::Sum)
    }
}

/// Ordered column → reducer assignments. Output columns follow this order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReducerMap {
    entries: Vec<(String, Reducer)>,
}

impl ReducerMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign `reducer` to `column`, replacing any earlier assignment.
    pub fn with(mut self, column: &str, reducer: Reducer) -> Self {
        match self.entries.iter_mut().find(|(c, _)| c == column) {
            Some(entry) => entry.1 = reducer,
            None => self.entries.push((column.to_string(), reducer)),
        }
        self
    }

    pub fn sum(self, column: &str) -> Self {
        self.with(column, Reducer::Sum)
    }

    pub fn mean(self, column: &str) -> Self {
        self.with(column, Reducer::Mean)
    }

    pub fn weighted_mean(self, column: &str, weight: &str) -> Self {
        self.with(
            column,
            Reducer::WeightedMean {
                weight: weight.to_string(),
            },
        )
    }

    pub fn sum_all(columns: &[&str]) -> Self {
        columns.iter().fold(Self::new(), |m, c| m.sum(c))
    }

    pub fn mean_all(columns: &[&str]) -> Self {
        columns.iter().fold(Self::new(), |m, c| m.mean(c))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Reducer)> {
        self.entries.iter().map(|(c, r)| (c.as_str(), r))
    }

    pub fn get(&self, column: &str) -> Option<&Reducer> {
        self.entries.iter().find(|(c, _)| c == column).map(|(_, r)| r)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every column the reducers read, weights included.
    pub fn input_columns(&self) -> Vec<&str> {
        let mut cols: Vec<&str> = Vec::new();
        for (col, reducer) in &self.entries {
            if !cols.contains(&col.as_str()) {
                cols.push(col);
            }
            if let Reducer::WeightedMean { weight } = reducer {
                if !cols.contains(&weight.as_str()) {
                    cols.push(weight);
                }
            }
        }
        cols
    }
}

#[derive(Debug, Default)]
struct Accumulator {
    sum: f64,
    count: u64,
    min: Option<f64>,
    max: Option<f64>,
    weighted_sum: f64,
    weight_total: f64,
}

impl Accumulator {
    fn push(&mut self, value: f64, weight: Option<f64>) {
        self.sum += value;
        self.count += 1;
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
        if let Some(w) = weight.filter(|w| *w > 0.0) {
            self.weighted_sum += value * w;
            self.weight_total += w;
        }
    }

    fn finish(&self, reducer: &Reducer) -> Value {
        // Nulls are skipped; a bucket of only nulls sums to zero and has no mean.
        match reducer {
            Reducer::Sum => Value::Number(self.sum),
            Reducer::Mean => self.mean(),
            Reducer::Min => self.min.map(Value::Number).unwrap_or(Value::Null),
            Reducer::Max => self.max.map(Value::Number).unwrap_or(Value::Null),
            Reducer::WeightedMean { .. } if self.weight_total > 0.0 => {
                Value::Number(self.weighted_sum / self.weight_total)
            }
            Reducer::WeightedMean { .. } => self.mean(),
        }
    }

    fn mean(&self) -> Value {
        if self.count == 0 {
            Value::Null
        } else {
            Value::Number(self.sum / self.count as f64)
        }
    }
}

/// Reduce a group of rows to one row holding only the reducer columns.
pub fn reduce_rows<'a, I>(rows: I, reducers: &ReducerMap) -> Result<Row>
where
    I: IntoIterator<Item = &'a Row>,
{
    let mut accs: Vec<Accumulator> = reducers.iter().map(|_| Accumulator::default()).collect();
    for row in rows {
        for ((column, reducer), acc) in reducers.iter().zip(accs.iter_mut()) {
            let weight = match reducer {
                Reducer::WeightedMean { weight } => snapshot::number(row, weight)?,
                _ => None,
            };
            if let Some(value) = snapshot::number(row, column)? {
                acc.push(value, weight);
            }
        }
    }
    Ok(reducers
        .iter()
        .zip(accs.iter())
        .map(|((column, reducer), acc)| (column.to_string(), acc.finish(reducer)))
        .collect())
}

/// Re-bucket a daily series. Daily is the identity; otherwise one row per
/// bucket, in bucket order, carrying the bucket label in `date_column` and
/// only the reduced columns.
pub fn aggregate(
    rows: &[Row],
    date_column: &str,
    granularity: Granularity,
    reducers: &ReducerMap,
) -> Result<Vec<Row>> {
    if granularity == Granularity::Daily {
        return Ok(rows.to_vec());
    }
    aggregate_by(rows, date_column, &[], granularity, reducers)
}

/// Group by (bucket, group columns) and reduce. Unlike [`aggregate`] this
/// groups at every granularity, so duplicate (date, category) rows are
/// merged even for daily output.
pub fn aggregate_by(
    rows: &[Row],
    date_column: &str,
    group_columns: &[&str],
    granularity: Granularity,
    reducers: &ReducerMap,
) -> Result<Vec<Row>> {
    type Key = (NaiveDate, Vec<String>);
    let mut groups: BTreeMap<Key, (Vec<Value>, Vec<&Row>)> = BTreeMap::new();

    for row in rows {
        let label = granularity.label_of(snapshot::date(row, date_column)?);
        let mut key_parts = Vec::with_capacity(group_columns.len());
        let mut key_values = Vec::with_capacity(group_columns.len());
        for col in group_columns {
            let value = snapshot::cell(row, col)?;
            key_parts.push(value.label());
            key_values.push(value.clone());
        }
        groups
            .entry((label, key_parts))
            .or_insert_with(|| (key_values, Vec::new()))
            .1
            .push(row);
    }

    let mut out = Vec::with_capacity(groups.len());
    for ((label, _), (key_values, members)) in groups {
        let mut reduced = reduce_rows(members, reducers)?;
        reduced.insert(date_column.to_string(), Value::from(label));
        for (col, value) in group_columns.iter().zip(key_values) {
            reduced.insert(col.to_string(), value);
        }
        out.push(reduced);
    }
    Ok(out)
}
