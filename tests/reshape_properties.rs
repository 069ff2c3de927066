//! Reshaping laws for the time-bucket aggregator and the top-N collapser.
//!
//! Test categories:
//!   1. Identity law            -- daily aggregation returns the input
//!   2. Bucket sums             -- weekly/monthly sums match the daily values inside
//!   3. Mass conservation       -- top-N keeps per-date totals
//!   4. Label bound             -- at most N+1 labels per date
//!   5. Worked scenarios        -- fixed inputs with known outputs
//!   6. Empty input             -- empty in, empty out

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};

use opdash::aggregate::{aggregate, aggregate_by, ReducerMap};
use opdash::bucket::Granularity;
use opdash::snapshot::{self, Row};
use opdash::topn::{collapse_per_bucket, TopN, OTHER_LABEL};
use opdash::value::Value;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn daily_row(day: NaiveDate, transactions: f64, block_time: f64) -> Row {
    let mut r = Row::new();
    r.insert("Date".to_string(), Value::from(day));
    r.insert("Transactions".to_string(), Value::Number(transactions));
    r.insert("BlockTime".to_string(), Value::Number(block_time));
    r
}

fn category_row(day: NaiveDate, cat: &str, volume: f64, transactions: f64) -> Row {
    let mut r = Row::new();
    r.insert("Date".to_string(), Value::from(day));
    r.insert("Cat".to_string(), Value::from(cat));
    r.insert("Vol".to_string(), Value::Number(volume));
    r.insert("Transactions".to_string(), Value::Number(transactions));
    r
}

/// Deterministic pseudo-random sequence (LCG), enough to vary inputs.
fn lcg(seed: &mut u64) -> f64 {
    *seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    ((*seed >> 33) % 1000) as f64
}

fn daily_series(days: u64) -> Vec<Row> {
    let mut seed = 7;
    let start = date(2023, 12, 20);
    (0..days)
        .map(|i| {
            let day = start.checked_add_days(Days::new(i)).unwrap();
            daily_row(day, lcg(&mut seed), 1.0 + lcg(&mut seed) / 500.0)
        })
        .collect()
}

fn category_series(dates: u64, cats: usize) -> Vec<Row> {
    let mut seed = 42;
    let start = date(2024, 1, 1);
    let mut rows = Vec::new();
    for i in 0..dates {
        let day = start.checked_add_days(Days::new(i)).unwrap();
        for c in 0..cats {
            // Coarse values so ties actually occur.
            let vol = (lcg(&mut seed) / 100.0).floor();
            rows.push(category_row(day, &format!("C{}", c), vol, lcg(&mut seed)));
        }
    }
    rows
}

fn per_date_sum(rows: &[Row], column: &str) -> BTreeMap<NaiveDate, f64> {
    let mut out = BTreeMap::new();
    for row in rows {
        let d = snapshot::date(row, "Date").unwrap();
        *out.entry(d).or_insert(0.0) += snapshot::number(row, column).unwrap().unwrap_or(0.0);
    }
    out
}

fn reducers() -> ReducerMap {
    ReducerMap::new()
        .sum("Transactions")
        .weighted_mean("BlockTime", "Transactions")
}

// ---------------------------------------------------------------------------
// 1. Identity law
// ---------------------------------------------------------------------------

#[test]
fn daily_aggregation_is_identity() {
    let rows = daily_series(45);
    assert_eq!(aggregate(&rows, "Date", Granularity::Daily, &reducers()).unwrap(), rows);

    // Columns without a reducer survive too: daily is a pass-through.
    let sparse = ReducerMap::new().sum("Transactions");
    assert_eq!(aggregate(&rows, "Date", Granularity::Daily, &sparse).unwrap(), rows);
}

// ---------------------------------------------------------------------------
// 2. Bucket sums
// ---------------------------------------------------------------------------

#[test]
fn bucket_sums_match_daily_values() {
    let rows = daily_series(90);
    for granularity in [Granularity::Weekly, Granularity::Monthly] {
        let out = aggregate(&rows, "Date", granularity, &reducers()).unwrap();
        let mut total = 0.0;
        for bucket_row in &out {
            let label = snapshot::date(bucket_row, "Date").unwrap();
            let bucket = granularity.bucket(label);
            let expected: f64 = rows
                .iter()
                .filter(|r| bucket.contains(snapshot::date(r, "Date").unwrap()))
                .map(|r| snapshot::number(r, "Transactions").unwrap().unwrap())
                .sum();
            let got = snapshot::number(bucket_row, "Transactions").unwrap().unwrap();
            assert!((got - expected).abs() < 1e-9, "{} bucket {}: {} != {}", granularity, label, got, expected);
            total += got;
        }
        let daily_total: f64 = rows.iter().map(|r| snapshot::number(r, "Transactions").unwrap().unwrap()).sum();
        assert!((total - daily_total).abs() < 1e-6);
    }
}

#[test]
fn unreduced_columns_are_dropped() {
    let rows = daily_series(10);
    let out = aggregate(&rows, "Date", Granularity::Weekly, &ReducerMap::new().sum("Transactions")).unwrap();
    for row in &out {
        assert!(row.contains_key("Transactions"));
        assert!(!row.contains_key("BlockTime"));
    }
}

// ---------------------------------------------------------------------------
// 3-4. Mass conservation and label bound
// ---------------------------------------------------------------------------

#[test]
fn top_n_conserves_mass_and_bounds_labels() {
    let rows = category_series(12, 8);
    let before = per_date_sum(&rows, "Vol");
    let before_tx = per_date_sum(&rows, "Transactions");

    for n in 0..=9 {
        let spec = TopN::new(n, "Cat", "Vol", ReducerMap::sum_all(&["Vol", "Transactions"]));
        let out = collapse_per_bucket(&rows, "Date", &spec).unwrap();

        let after = per_date_sum(&out, "Vol");
        let after_tx = per_date_sum(&out, "Transactions");
        for (d, v) in &before {
            assert!((after[d] - v).abs() < 1e-9, "n={} date={} Vol", n, d);
            assert!((after_tx[d] - before_tx[d]).abs() < 1e-9, "n={} date={} Transactions", n, d);
        }

        let mut labels: BTreeMap<NaiveDate, Vec<String>> = BTreeMap::new();
        for row in &out {
            labels
                .entry(snapshot::date(row, "Date").unwrap())
                .or_default()
                .push(snapshot::cell(row, "Cat").unwrap().label());
        }
        for (d, ls) in labels {
            assert!(ls.len() <= n + 1, "n={} date={} has {} labels", n, d, ls.len());
            let mut dedup = ls.clone();
            dedup.sort();
            dedup.dedup();
            assert_eq!(dedup.len(), ls.len(), "one row per (date, label)");
        }
    }
}

#[test]
fn top_n_is_deterministic() {
    let rows = category_series(6, 7);
    let spec = TopN::new(3, "Cat", "Vol", ReducerMap::sum_all(&["Vol"]));
    let a = collapse_per_bucket(&rows, "Date", &spec).unwrap();
    let b = collapse_per_bucket(&rows, "Date", &spec).unwrap();
    assert_eq!(a, b);
}

// ---------------------------------------------------------------------------
// 5. Worked scenarios
// ---------------------------------------------------------------------------

#[test]
fn scenario_top_two_of_three() {
    let d = date(2024, 1, 1);
    let rows = vec![
        category_row(d, "A", 10.0, 1.0),
        category_row(d, "B", 5.0, 1.0),
        category_row(d, "C", 1.0, 1.0),
    ];
    let spec = TopN::new(2, "Cat", "Vol", ReducerMap::sum_all(&["Vol"]));
    let out = collapse_per_bucket(&rows, "Date", &spec).unwrap();

    let got: Vec<(String, f64)> = out
        .iter()
        .map(|r| {
            (
                snapshot::cell(r, "Cat").unwrap().label(),
                snapshot::number(r, "Vol").unwrap().unwrap(),
            )
        })
        .collect();
    assert_eq!(
        got,
        vec![
            ("A".to_string(), 10.0),
            ("B".to_string(), 5.0),
            (OTHER_LABEL.to_string(), 1.0),
        ]
    );
}

#[test]
fn scenario_week_of_hundreds() {
    // 2024-01-01 is a Monday; the week ends on Sunday the 7th.
    let rows: Vec<Row> = (1..=7).map(|d| daily_row(date(2024, 1, d), 100.0, 2.0)).collect();
    let out = aggregate(&rows, "Date", Granularity::Weekly, &reducers()).unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(snapshot::number(&out[0], "Transactions").unwrap(), Some(700.0));
    assert_eq!(snapshot::number(&out[0], "BlockTime").unwrap(), Some(2.0));
    assert_eq!(snapshot::date(&out[0], "Date").unwrap(), date(2024, 1, 7));
}

#[test]
fn scenario_bucket_then_collapse() {
    // Bucketing first, then ranking within each bucket.
    let mut rows = Vec::new();
    for d in 1..=7 {
        rows.push(category_row(date(2024, 1, d), "A", 1.0, 1.0));
        rows.push(category_row(date(2024, 1, d), "B", 2.0, 1.0));
        rows.push(category_row(date(2024, 1, d), "C", if d == 7 { 20.0 } else { 0.0 }, 1.0));
    }
    let measures = ReducerMap::sum_all(&["Vol", "Transactions"]);
    let weekly = aggregate_by(&rows, "Date", &["Cat"], Granularity::Weekly, &measures).unwrap();
    let out = collapse_per_bucket(&weekly, "Date", &TopN::new(1, "Cat", "Vol", measures)).unwrap();

    assert_eq!(out.len(), 2);
    assert_eq!(snapshot::cell(&out[0], "Cat").unwrap().label(), "C");
    assert_eq!(snapshot::number(&out[0], "Vol").unwrap(), Some(20.0));
    assert_eq!(snapshot::cell(&out[1], "Cat").unwrap().label(), OTHER_LABEL);
    assert_eq!(snapshot::number(&out[1], "Vol").unwrap(), Some(21.0));
    assert_eq!(snapshot::number(&out[1], "Transactions").unwrap(), Some(14.0));
}

// ---------------------------------------------------------------------------
// 6. Empty input
// ---------------------------------------------------------------------------

#[test]
fn empty_input_yields_empty_output() {
    for granularity in Granularity::ALL {
        assert!(aggregate(&[], "Date", granularity, &reducers()).unwrap().is_empty());
        assert!(aggregate_by(&[], "Date", &["Cat"], granularity, &reducers()).unwrap().is_empty());
    }
    let spec = TopN::new(3, "Cat", "Vol", ReducerMap::sum_all(&["Vol"]));
    assert!(collapse_per_bucket(&[], "Date", &spec).unwrap().is_empty());
}
