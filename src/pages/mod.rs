//! Dashboard pages: which queries each page reads and how each section
//! shapes its snapshot.
//!
//! A page load fetches every query the page needs up front
//! ([`load`]); rendering ([`PageData::view`]) is then a pure function of
//! the fetched snapshots and the per-section granularity selection, so
//! changing a granularity never re-fetches.

mod bridges;
mod fees;
mod governance;
mod macro_kpis;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use futures_util::future::join_all;
use serde::Serialize;

use crate::aggregate::{aggregate, aggregate_by, ReducerMap};
use crate::bucket::Granularity;
use crate::catalog::QueryId;
use crate::error::{DashError, Result};
use crate::feed::{Fetched, SnapshotFetcher};
use crate::heatmap::heatmap;
use crate::logging::{log, log_section_error, obj, v_str, Domain, Level, ProfileScope};
use crate::render::{ChartData, ChartKind, MetricDisplay, PageView, SectionBody, SectionRender, SectionView};
use crate::shares::{normalize_per_bucket, shares};
use crate::snapshot::{self, Snapshot};
use crate::topn::{collapse_overall, collapse_per_bucket, head_n, TopN};
use crate::ui_state::SectionState;

/// Date column shared by every daily query.
pub const DATE_COLUMN: &str = "Date";
const HEATMAP_DAY: &str = "Day";
const HEATMAP_HOUR: &str = "Hour";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Page {
    Macro,
    Fees,
    Governance,
    Bridges,
}

impl Page {
    pub const ALL: [Page; 4] = [Page::Macro, Page::Fees, Page::Governance, Page::Bridges];

    pub fn as_str(&self) -> &'static str {
        match self {
            Page::Macro => "macro",
            Page::Fees => "fees",
            Page::Governance => "governance",
            Page::Bridges => "bridges",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Page::Macro => "Macro",
            Page::Fees => "Fees",
            Page::Governance => "Governance",
            Page::Bridges => "Bridges",
        }
    }

    pub fn sections(&self) -> Vec<SectionDef> {
        match self {
            Page::Macro => macro_kpis::sections(),
            Page::Fees => fees::sections(),
            Page::Governance => governance::sections(),
            Page::Bridges => bridges::sections(),
        }
    }

    /// Distinct queries the page reads, in first-use order.
    pub fn queries(&self) -> Vec<QueryId> {
        let mut out: Vec<QueryId> = Vec::new();
        for def in self.sections() {
            if !out.contains(&def.query) {
                out.push(def.query);
            }
        }
        out
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Page {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let needle = s.trim();
        Page::ALL
            .iter()
            .copied()
            .find(|p| p.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| format!("unknown page `{}`", needle))
    }
}

/// One scalar on a metrics section, read from the first row.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSpec {
    pub label: &'static str,
    pub column: &'static str,
    pub decimals: usize,
    pub unit: Option<&'static str>,
}

pub const fn metric(
    label: &'static str,
    column: &'static str,
    decimals: usize,
    unit: Option<&'static str>,
) -> MetricSpec {
    MetricSpec {
        label,
        column,
        decimals,
        unit,
    }
}

/// Keep the `n` categories ranked highest by `rank_by`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TopNSpec {
    pub n: usize,
    pub rank_by: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SectionSpec {
    Metrics(Vec<MetricSpec>),
    /// Daily series re-bucketed at the selected granularity.
    TimeSeries {
        kind: ChartKind,
        y: Vec<&'static str>,
        reducers: ReducerMap,
    },
    /// Series split by a category column, bucketed, then optionally
    /// collapsed to the top N per bucket. Stacked areas are normalized to
    /// per-bucket percentages.
    CategorySeries {
        kind: ChartKind,
        category: &'static str,
        y: Vec<&'static str>,
        reducers: ReducerMap,
        top_n: Option<TopNSpec>,
    },
    /// Un-dated rows passed through as-is.
    Breakdown {
        kind: ChartKind,
        category: &'static str,
        y: Vec<&'static str>,
    },
    /// Share of `value` per category, optionally after an overall top N.
    Shares {
        category: &'static str,
        value: &'static str,
        top_n: Option<TopNSpec>,
    },
    /// Best `limit` rows by `rank_by`. With `collapse`, the rest fold into
    /// "Other" using those reducers; without, they are dropped.
    Ranking {
        kind: ChartKind,
        category: &'static str,
        y: Vec<&'static str>,
        rank_by: &'static str,
        limit: usize,
        collapse: Option<ReducerMap>,
    },
    /// Mean of `measure` per weekday and hour.
    Heatmap { measure: &'static str },
}

impl SectionSpec {
    /// Whether the section responds to a granularity selection.
    pub fn is_granular(&self) -> bool {
        matches!(
            self,
            SectionSpec::TimeSeries { .. } | SectionSpec::CategorySeries { .. }
        )
    }

    /// Columns the section reads from its snapshot.
    pub fn required_columns(&self) -> Vec<&str> {
        let mut cols: Vec<&str> = match self {
            SectionSpec::Metrics(metrics) => metrics.iter().map(|m| m.column).collect(),
            SectionSpec::TimeSeries { y, reducers, .. } => {
                let mut c = vec![DATE_COLUMN];
                c.extend(y.iter().copied());
                c.extend(reducers.input_columns());
                c
            }
            SectionSpec::CategorySeries {
                category,
                y,
                reducers,
                top_n,
                ..
            } => {
                let mut c = vec![DATE_COLUMN, *category];
                c.extend(y.iter().copied());
                c.extend(reducers.input_columns());
                if let Some(t) = top_n {
                    c.push(t.rank_by);
                }
                c
            }
            SectionSpec::Breakdown { category, y, .. } => {
                let mut c = vec![*category];
                c.extend(y.iter().copied());
                c
            }
            SectionSpec::Shares {
                category,
                value,
                top_n,
            } => {
                let mut c = vec![*category, *value];
                if let Some(t) = top_n {
                    c.push(t.rank_by);
                }
                c
            }
            SectionSpec::Ranking {
                category,
                y,
                rank_by,
                collapse,
                ..
            } => {
                let mut c = vec![*category, *rank_by];
                c.extend(y.iter().copied());
                if let Some(reducers) = collapse {
                    c.extend(reducers.input_columns());
                }
                c
            }
            SectionSpec::Heatmap { measure } => vec![HEATMAP_DAY, HEATMAP_HOUR, *measure],
        };
        let mut seen = Vec::with_capacity(cols.len());
        cols.retain(|c| {
            if seen.contains(c) {
                false
            } else {
                seen.push(*c);
                true
            }
        });
        cols
    }

    /// Shape a non-empty snapshot into a section body.
    pub fn shape(&self, snap: &Snapshot, granularity: Granularity) -> Result<SectionBody> {
        snap.require_columns(&self.required_columns())?;
        let rows = &snap.rows;

        match self {
            SectionSpec::Metrics(metrics) => {
                let first = snap.first_row()?;
                let mut out = Vec::with_capacity(metrics.len());
                for m in metrics {
                    out.push(MetricDisplay::new(
                        m.label,
                        snapshot::number(first, m.column)?,
                        m.decimals,
                        m.unit,
                    ));
                }
                Ok(SectionBody::Metrics(out))
            }
            SectionSpec::TimeSeries { kind, y, reducers } => {
                let shaped = aggregate(rows, DATE_COLUMN, granularity, reducers)?;
                Ok(SectionBody::Chart(chart(*kind, DATE_COLUMN, y, None, shaped, Some(granularity), None)))
            }
            SectionSpec::CategorySeries {
                kind,
                category,
                y,
                reducers,
                top_n,
            } => {
                let mut shaped = aggregate_by(rows, DATE_COLUMN, &[*category], granularity, reducers)?;
                if let Some(t) = top_n {
                    let spec = TopN::new(t.n, category, t.rank_by, reducers.clone());
                    shaped = collapse_per_bucket(&shaped, DATE_COLUMN, &spec)?;
                }
                if *kind == ChartKind::StackedArea {
                    for column in y {
                        shaped = normalize_per_bucket(&shaped, DATE_COLUMN, column)?;
                    }
                }
                Ok(SectionBody::Chart(chart(
                    *kind,
                    DATE_COLUMN,
                    y,
                    Some(*category),
                    shaped,
                    Some(granularity),
                    top_n.map(|t| t.n),
                )))
            }
            SectionSpec::Breakdown { kind, category, y } => Ok(SectionBody::Chart(chart(
                *kind,
                category,
                y,
                Some(*category),
                rows.clone(),
                None,
                None,
            ))),
            SectionSpec::Shares {
                category,
                value,
                top_n,
            } => {
                let base = match top_n {
                    Some(t) => {
                        let spec = TopN::new(t.n, category, t.rank_by, ReducerMap::sum_all(&[*value]));
                        collapse_overall(rows, &spec)?
                    }
                    None => rows.clone(),
                };
                Ok(SectionBody::Shares(shares(&base, category, value)?))
            }
            SectionSpec::Ranking {
                kind,
                category,
                y,
                rank_by,
                limit,
                collapse,
            } => {
                let shaped = match collapse {
                    Some(reducers) => {
                        let spec = TopN::new(*limit, category, rank_by, reducers.clone());
                        collapse_overall(rows, &spec)?
                    }
                    None => head_n(rows, rank_by, *limit)?,
                };
                Ok(SectionBody::Chart(chart(
                    *kind,
                    category,
                    y,
                    Some(*category),
                    shaped,
                    None,
                    Some(*limit),
                )))
            }
            SectionSpec::Heatmap { measure } => Ok(SectionBody::Heatmap(heatmap(
                rows,
                HEATMAP_DAY,
                HEATMAP_HOUR,
                measure,
            )?)),
        }
    }
}

fn chart(
    kind: ChartKind,
    x: &str,
    y: &[&str],
    color: Option<&str>,
    rows: Vec<snapshot::Row>,
    granularity: Option<Granularity>,
    top_n: Option<usize>,
) -> ChartData {
    ChartData {
        kind,
        x: x.to_string(),
        y: y.iter().map(|c| c.to_string()).collect(),
        color: color.map(str::to_string),
        rows,
        granularity,
        top_n,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectionDef {
    pub id: &'static str,
    pub title: &'static str,
    pub query: QueryId,
    pub spec: SectionSpec,
}

impl SectionDef {
    pub fn new(id: &'static str, title: &'static str, query: QueryId, spec: SectionSpec) -> Self {
        Self {
            id,
            title,
            query,
            spec,
        }
    }
}

/// Fetch results for every query a page needs.
pub struct PageData {
    page: Page,
    fetched: HashMap<QueryId, Result<Fetched>>,
}

/// Fetch all of a page's snapshots concurrently. Individual failures are
/// kept and surface only in the sections that need them.
pub async fn load(page: Page, fetcher: &SnapshotFetcher) -> PageData {
    let _scope = ProfileScope::with_context("page_load", &[("page", v_str(page.as_str()))]);
    let queries = page.queries();
    let results = join_all(queries.iter().map(|id| fetcher.fetch(*id))).await;
    log(
        Level::Info,
        Domain::Page,
        "page_loaded",
        obj(&[
            ("page", v_str(page.as_str())),
            ("queries", serde_json::json!(queries.len())),
            (
                "failed",
                serde_json::json!(results.iter().filter(|r| r.is_err()).count()),
            ),
        ]),
    );
    PageData {
        page,
        fetched: queries.into_iter().zip(results).collect(),
    }
}

impl PageData {
    pub fn page(&self) -> Page {
        self.page
    }

    pub fn fetched(&self, id: QueryId) -> Option<&Result<Fetched>> {
        self.fetched.get(&id)
    }

    /// Render every section. Errors stay inside their section.
    pub fn view(&self, state: &SectionState) -> PageView {
        let sections = self
            .page
            .sections()
            .iter()
            .map(|def| self.render_section(def, state))
            .collect();
        PageView {
            page: self.page.as_str().to_string(),
            title: self.page.title().to_string(),
            sections,
        }
    }

    fn render_section(&self, def: &SectionDef, state: &SectionState) -> SectionRender {
        let granularity = state.get(def.id);
        let view = match self.fetched.get(&def.query) {
            None => self.unavailable(
                def,
                DashError::config(format!("query {} was not loaded", def.query)),
            ),
            Some(Err(err)) => self.unavailable(def, err.clone()),
            Some(Ok(fetched)) if fetched.snapshot.is_empty() => SectionView::Empty,
            Some(Ok(fetched)) => match def.spec.shape(&fetched.snapshot, granularity) {
                Ok(body) => SectionView::Ready {
                    body,
                    cache: fetched.status,
                },
                Err(DashError::EmptyData { .. }) => SectionView::Empty,
                Err(err) => self.unavailable(def, err.in_context(def.query.name())),
            },
        };
        SectionRender {
            id: def.id.to_string(),
            title: def.title.to_string(),
            granularity: def.spec.is_granular().then_some(granularity),
            view,
        }
    }

    fn unavailable(&self, def: &SectionDef, err: DashError) -> SectionView {
        log_section_error(self.page.as_str(), def.id, err.kind(), &err.to_string());
        SectionView::unavailable(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_page_names_round_trip() {
        for page in Page::ALL {
            assert_eq!(page.as_str().parse::<Page>().unwrap(), page);
        }
        assert_eq!("Bridges".parse::<Page>().unwrap(), Page::Bridges);
        assert!("home".parse::<Page>().is_err());
    }

    #[test]
    fn test_section_ids_unique_per_page() {
        for page in Page::ALL {
            let mut seen = HashSet::new();
            for def in page.sections() {
                assert!(seen.insert(def.id), "{} repeats section {}", page, def.id);
            }
        }
    }

    #[test]
    fn test_sections_read_only_contracted_columns() {
        for page in Page::ALL {
            for def in page.sections() {
                let contract = def.query.columns();
                for col in def.spec.required_columns() {
                    assert!(
                        contract.contains(&col),
                        "{}/{} reads `{}` not returned by {}",
                        page,
                        def.id,
                        col,
                        def.query
                    );
                }
            }
        }
    }

    #[test]
    fn test_pages_cover_catalog() {
        let used: HashSet<QueryId> = Page::ALL.iter().flat_map(|p| p.queries()).collect();
        for id in QueryId::ALL {
            assert!(used.contains(&id), "{} unused", id);
        }
    }

    #[test]
    fn test_price_chart_plots_change() {
        let def = Page::Macro
            .sections()
            .into_iter()
            .find(|d| d.id == "price_over_time")
            .unwrap();
        let snap = Snapshot::from_json_bytes(
            QueryId::PricesDaily,
            br#"[{"Date":"2024-01-01","Price":1.5,"Change":-2.0},{"Date":"2024-01-02","Price":1.6,"Change":6.6}]"#,
        )
        .unwrap();
        match def.spec.shape(&snap, Granularity::Daily).unwrap() {
            SectionBody::Chart(chart) => {
                assert_eq!(chart.y, vec!["Price".to_string(), "Change".to_string()]);
                assert_eq!(chart.rows.len(), 2);
            }
            other => panic!("expected chart, got {:?}", other),
        }
    }

    #[test]
    fn test_top_n_thresholds() {
        let top_ns: Vec<usize> = Page::Bridges
            .sections()
            .iter()
            .filter_map(|d| match &d.spec {
                SectionSpec::CategorySeries { top_n: Some(t), .. } => Some(t.n),
                SectionSpec::Shares { top_n: Some(t), .. } => Some(t.n),
                SectionSpec::Ranking { limit, .. } => Some(*limit),
                _ => None,
            })
            .collect();
        assert!(top_ns.contains(&3));
        assert!(top_ns.contains(&5));
        assert!(top_ns.contains(&10));
    }
}
