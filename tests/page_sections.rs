//! Page loading and section isolation against an in-process data source.
//!
//! Covers: fetch failures scoped to their sections, schema errors, empty
//! snapshots, granularity changes without re-fetching, and the top-N
//! sections on the bridges page.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use opdash::bucket::Granularity;
use opdash::catalog::{Catalog, QueryId, QuerySpec};
use opdash::error::{DashError, Result};
use opdash::feed::{CacheStatus, SnapshotFetcher, SnapshotSource};
use opdash::pages::{self, Page};
use opdash::render::{SectionBody, SectionView};
use opdash::snapshot::{self, Snapshot};
use opdash::topn::OTHER_LABEL;
use opdash::ui_state::SectionState;

/// Canned payloads per query; anything unlisted returns `[]`.
#[derive(Default)]
struct StubSource {
    payloads: HashMap<QueryId, String>,
    failing: HashSet<QueryId>,
    calls: AtomicUsize,
}

impl StubSource {
    fn with(mut self, id: QueryId, body: impl Into<String>) -> Self {
        self.payloads.insert(id, body.into());
        self
    }

    fn failing(mut self, id: QueryId) -> Self {
        self.failing.insert(id);
        self
    }
}

#[async_trait]
impl SnapshotSource for StubSource {
    async fn fetch(&self, spec: &QuerySpec) -> Result<Snapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&spec.id) {
            return Err(DashError::fetch(spec.id, "connection refused"));
        }
        let body = self.payloads.get(&spec.id).map(String::as_str).unwrap_or("[]");
        Snapshot::from_json_bytes(spec.id, body.as_bytes())
    }
}

fn fetcher(source: Arc<StubSource>) -> SnapshotFetcher {
    SnapshotFetcher::new(source, Catalog::flipside().unwrap(), Duration::from_secs(900))
}

fn bridges_daily(days: u32) -> String {
    let rows: Vec<String> = (1..=days)
        .map(|d| {
            format!(
                r#"{{"Date":"2024-01-{:02}","Transactions":100,"Bridgers":10,"Volume":1000,"AmountAverage":10,"AmountMedian":5}}"#,
                d
            )
        })
        .collect();
    format!("[{}]", rows.join(","))
}

const BRIDGES_OVERVIEW: &str = r#"[{"Volume":1234567.8,"AmountAverage":950.2,"AmountMedian":120.0,"Transactions":5000,"Bridgers":2100,"Protocols":7}]"#;

fn state() -> SectionState {
    SectionState::new(Granularity::Daily)
}

// ---------------------------------------------------------------------------
// Failure isolation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unreachable_query_only_breaks_its_sections() {
    let source = Arc::new(
        StubSource::default()
            .with(QueryId::AirdropsOverview, r#"[{"EligibleUsers":248699,"AllocatedTokens":214748364,"Receivers":180000,"Amount":200000000,"ClaimedUsers":72,"ClaimedAmount":93}]"#)
            .failing(QueryId::AirdropsHoldings),
    );
    let f = fetcher(source);
    let view = pages::load(Page::Governance, &f).await.view(&state());

    for id in ["holdings_claimers_share", "holdings_average", "holdings_volume_share"] {
        match &view.section(id).unwrap().view {
            SectionView::Unavailable { kind, reason } => {
                assert_eq!(kind, "fetch");
                assert!(reason.contains("connection refused"), "{}", reason);
            }
            other => panic!("{} should be unavailable, got {:?}", id, other),
        }
    }

    let overview = view.section("airdrops_overview").unwrap();
    match &overview.view {
        SectionView::Ready { body: SectionBody::Metrics(metrics), .. } => {
            assert_eq!(metrics[0].label, "Eligible Users");
            assert_eq!(metrics[0].value, "248,699");
        }
        other => panic!("overview should render, got {:?}", other),
    }
    assert_eq!(view.unavailable_count(), 3);
}

#[tokio::test]
async fn missing_column_is_schema_error_for_that_section() {
    let source = Arc::new(
        StubSource::default()
            .with(QueryId::BridgesOverview, r#"[{"Volume":1.0,"Transactions":2}]"#)
            .with(QueryId::BridgesDaily, bridges_daily(3)),
    );
    let view = pages::load(Page::Bridges, &fetcher(source)).await.view(&state());

    match &view.section("bridges_overview").unwrap().view {
        SectionView::Unavailable { kind, reason } => {
            assert_eq!(kind, "schema");
            assert!(reason.contains("AmountAverage"), "{}", reason);
        }
        other => panic!("expected schema error, got {:?}", other),
    }
    assert!(view.section("bridges_volume_over_time").unwrap().view.is_ready());
}

#[tokio::test]
async fn empty_snapshot_renders_empty_state() {
    let source = Arc::new(StubSource::default());
    let view = pages::load(Page::Fees, &fetcher(source)).await.view(&state());
    for section in &view.sections {
        assert_eq!(section.view, SectionView::Empty, "{}", section.id);
    }
}

// ---------------------------------------------------------------------------
// Granularity selection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn granularity_change_reuses_fetched_snapshots() {
    let source = Arc::new(
        StubSource::default()
            .with(QueryId::BridgesOverview, BRIDGES_OVERVIEW)
            .with(QueryId::BridgesDaily, bridges_daily(14)),
    );
    let f = fetcher(source.clone());
    let data = pages::load(Page::Bridges, &f).await;
    let calls_after_load = source.calls.load(Ordering::SeqCst);
    assert_eq!(calls_after_load, Page::Bridges.queries().len());

    let rows_at = |g: Granularity| {
        let mut s = state();
        s.select("bridges_volume_over_time", g);
        let view = data.view(&s);
        let section = view.section("bridges_volume_over_time").unwrap().clone();
        assert_eq!(section.granularity, Some(g));
        match section.view {
            SectionView::Ready { body: SectionBody::Chart(chart), .. } => chart.rows,
            other => panic!("expected chart, got {:?}", other),
        }
    };

    assert_eq!(rows_at(Granularity::Daily).len(), 14);
    let weekly = rows_at(Granularity::Weekly);
    assert_eq!(weekly.len(), 2);
    assert_eq!(snapshot::number(&weekly[0], "Volume").unwrap(), Some(7000.0));
    let monthly = rows_at(Granularity::Monthly);
    assert_eq!(monthly.len(), 1);
    assert_eq!(snapshot::number(&monthly[0], "Volume").unwrap(), Some(14000.0));

    assert_eq!(source.calls.load(Ordering::SeqCst), calls_after_load);
}

#[tokio::test]
async fn sections_keep_independent_granularity() {
    let source = Arc::new(StubSource::default().with(QueryId::BridgesDaily, bridges_daily(14)));
    let data = pages::load(Page::Bridges, &fetcher(source)).await;

    let mut s = state();
    s.select("bridges_activity_over_time", Granularity::Weekly);
    let view = data.view(&s);
    assert_eq!(view.section("bridges_activity_over_time").unwrap().granularity, Some(Granularity::Weekly));
    assert_eq!(view.section("bridges_volume_over_time").unwrap().granularity, Some(Granularity::Daily));
    assert_eq!(view.section("bridges_overview").unwrap().granularity, None);
}

#[tokio::test]
async fn second_load_is_served_from_cache() {
    let source = Arc::new(StubSource::default().with(QueryId::BridgesOverview, BRIDGES_OVERVIEW));
    let f = fetcher(source.clone());
    pages::load(Page::Bridges, &f).await;
    let view = pages::load(Page::Bridges, &f).await.view(&state());

    assert_eq!(source.calls.load(Ordering::SeqCst), Page::Bridges.queries().len());
    match &view.section("bridges_overview").unwrap().view {
        SectionView::Ready { cache, .. } => assert_eq!(*cache, CacheStatus::Cached),
        other => panic!("expected ready, got {:?}", other),
    }
}

// ---------------------------------------------------------------------------
// Top-N sections
// ---------------------------------------------------------------------------

#[tokio::test]
async fn token_series_keeps_top_three_per_date() {
    let mut rows = Vec::new();
    for (token, volume) in [("USDC", 500), ("ETH", 400), ("WBTC", 300), ("DAI", 200), ("OP", 100)] {
        rows.push(format!(
            r#"{{"Date":"2024-01-01","Token":"{}","Transactions":10,"Bridgers":5,"Volume":{},"AmountAverage":{},"AmountMedian":1}}"#,
            token, volume, volume / 10
        ));
    }
    let source = Arc::new(
        StubSource::default().with(QueryId::BridgesTokensDaily, format!("[{}]", rows.join(","))),
    );
    let view = pages::load(Page::Bridges, &fetcher(source)).await.view(&state());

    let chart = match &view.section("tokens_over_time").unwrap().view {
        SectionView::Ready { body: SectionBody::Chart(chart), .. } => chart.clone(),
        other => panic!("expected chart, got {:?}", other),
    };
    assert_eq!(chart.top_n, Some(3));
    let labels: Vec<String> = chart
        .rows
        .iter()
        .map(|r| snapshot::cell(r, "Token").unwrap().label())
        .collect();
    assert_eq!(labels, vec!["USDC", "ETH", "WBTC", OTHER_LABEL]);
    let other = chart.rows.last().unwrap();
    assert_eq!(snapshot::number(other, "Volume").unwrap(), Some(300.0));
    // Equal transaction weights: (20 + 10) / 2.
    assert_eq!(snapshot::number(other, "AmountAverage").unwrap(), Some(15.0));

    let stacked = match &view.section("tokens_share_over_time").unwrap().view {
        SectionView::Ready { body: SectionBody::Chart(chart), .. } => chart.clone(),
        other => panic!("expected chart, got {:?}", other),
    };
    let total: f64 = stacked
        .rows
        .iter()
        .map(|r| snapshot::number(r, "Volume").unwrap().unwrap())
        .sum();
    assert!((total - 100.0).abs() < 1e-9);
}

#[tokio::test]
async fn token_overview_charts_rank_by_plotted_column() {
    // Volume falls as transactions and average amount rise.
    let rows: Vec<String> = (1..=12)
        .map(|i| {
            format!(
                r#"{{"Token":"T{}","Volume":{},"Transactions":{},"Bridgers":1,"AmountAverage":{},"AmountMedian":1}}"#,
                i,
                100 - i,
                i,
                i * 10
            )
        })
        .collect();
    let source = Arc::new(
        StubSource::default().with(QueryId::BridgesTokensOverview, format!("[{}]", rows.join(","))),
    );
    let view = pages::load(Page::Bridges, &fetcher(source)).await.view(&state());

    let shares_of = |id: &str| match &view.section(id).unwrap().view {
        SectionView::Ready { body: SectionBody::Shares(shares), .. } => shares.clone(),
        other => panic!("expected shares for {}, got {:?}", id, other),
    };

    let tx = shares_of("tokens_transactions_share");
    let labels: Vec<&str> = tx.iter().map(|s| s.label.as_str()).collect();
    assert_eq!(labels, vec!["T12", "T11", "T10", "T9", "T8", OTHER_LABEL]);
    // Other holds the transactions of T1..T7.
    assert_eq!(tx[5].value, 28.0);
    let pct: f64 = tx.iter().map(|s| s.percent).sum();
    assert!((pct - 100.0).abs() < 1e-9);

    let volume = shares_of("tokens_volume_share");
    let labels: Vec<&str> = volume.iter().map(|s| s.label.as_str()).collect();
    assert_eq!(labels, vec!["T1", "T2", "T3", "T4", "T5", OTHER_LABEL]);
    assert_eq!(volume[5].value, 637.0);

    let amounts = match &view.section("tokens_amount_average").unwrap().view {
        SectionView::Ready { body: SectionBody::Chart(chart), .. } => chart.rows.clone(),
        other => panic!("expected chart, got {:?}", other),
    };
    let labels: Vec<String> = amounts
        .iter()
        .map(|r| snapshot::cell(r, "Token").unwrap().label())
        .collect();
    let mut expected: Vec<String> = (3..=12).rev().map(|i| format!("T{}", i)).collect();
    expected.push(OTHER_LABEL.to_string());
    assert_eq!(labels, expected);
    assert_eq!(snapshot::number(&amounts[0], "AmountAverage").unwrap(), Some(120.0));
}
