//! Weekday × hour activity grids.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::{DashError, Result};
use crate::snapshot::{self, Row};

pub const WEEK_DAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapCell {
    pub day: String,
    pub hour: u32,
    /// Mean of the measure over rows in the cell; `None` for empty cells.
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Heatmap {
    pub measure: String,
    pub days: Vec<String>,
    pub cells: Vec<HeatmapCell>,
}

impl Heatmap {
    pub fn get(&self, day: &str, hour: u32) -> Option<f64> {
        self.cells
            .iter()
            .find(|c| c.day == day && c.hour == hour)
            .and_then(|c| c.value)
    }
}

/// Average `measure` per (day, hour). Days appear Monday..Sunday, with any
/// unrecognised day labels after, in input order. Every day gets all 24
/// hours.
pub fn heatmap(rows: &[Row], day_column: &str, hour_column: &str, measure: &str) -> Result<Heatmap> {
    let mut sums: HashMap<(String, u32), (f64, u64)> = HashMap::new();
    let mut extra_days: Vec<String> = Vec::new();
    let mut seen_week_days = [false; 7];

    for row in rows {
        let raw_day = snapshot::cell(row, day_column)?.label();
        let day = match week_day_index(&raw_day) {
            Some(idx) => {
                seen_week_days[idx] = true;
                WEEK_DAYS[idx].to_string()
            }
            None => {
                if !extra_days.contains(&raw_day) {
                    extra_days.push(raw_day.clone());
                }
                raw_day
            }
        };
        let hour = snapshot::number(row, hour_column)?
            .filter(|h| (0.0..24.0).contains(h) && h.fract() == 0.0)
            .ok_or_else(|| DashError::Schema {
                column: hour_column.to_string(),
                context: Some("hour outside 0..=23".to_string()),
            })? as u32;
        if let Some(v) = snapshot::number(row, measure)? {
            let entry = sums.entry((day, hour)).or_insert((0.0, 0));
            entry.0 += v;
            entry.1 += 1;
        }
    }

    let days: Vec<String> = WEEK_DAYS
        .iter()
        .zip(seen_week_days)
        .filter(|(_, seen)| *seen)
        .map(|(d, _)| d.to_string())
        .chain(extra_days)
        .collect();

    let mut cells = Vec::with_capacity(days.len() * 24);
    for day in &days {
        for hour in 0..24 {
            let value = sums
                .get(&(day.clone(), hour))
                .map(|(sum, count)| sum / *count as f64);
            cells.push(HeatmapCell {
                day: day.clone(),
                hour,
                value,
            });
        }
    }

    Ok(Heatmap {
        measure: measure.to_string(),
        days,
        cells,
    })
}

fn week_day_index(raw: &str) -> Option<usize> {
    let needle = raw.trim();
    WEEK_DAYS
        .iter()
        .position(|d| d.eq_ignore_ascii_case(needle) || d[..3].eq_ignore_ascii_case(needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn row(day: &str, hour: f64, tx: f64) -> Row {
        let mut r = Row::new();
        r.insert("Day".to_string(), Value::from(day));
        r.insert("Hour".to_string(), Value::Number(hour));
        r.insert("Transactions".to_string(), Value::Number(tx));
        r
    }

    #[test]
    fn test_days_ordered_and_averaged() {
        let rows = vec![
            row("Sunday", 0.0, 10.0),
            row("Monday", 3.0, 4.0),
            row("Monday", 3.0, 8.0),
            row("tue", 23.0, 1.0),
        ];
        let map = heatmap(&rows, "Day", "Hour", "Transactions").unwrap();
        assert_eq!(map.days, vec!["Monday", "Tuesday", "Sunday"]);
        assert_eq!(map.cells.len(), 3 * 24);
        assert_eq!(map.get("Monday", 3), Some(6.0));
        assert_eq!(map.get("Tuesday", 23), Some(1.0));
        assert_eq!(map.get("Monday", 4), None);
    }

    #[test]
    fn test_bad_hour_rejected() {
        let rows = vec![row("Monday", 24.0, 1.0)];
        let err = heatmap(&rows, "Day", "Hour", "Transactions").unwrap_err();
        assert_eq!(err.kind(), "schema");
    }

    #[test]
    fn test_unknown_day_kept() {
        let rows = vec![row("Holiday", 1.0, 2.0), row("Friday", 1.0, 3.0)];
        let map = heatmap(&rows, "Day", "Hour", "Transactions").unwrap();
        assert_eq!(map.days, vec!["Friday", "Holiday"]);
    }
}
