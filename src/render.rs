//! Render-ready page structures and the renderers that serialize them.
//!
//! Everything here is already shaped; a renderer only has to draw or print.

use serde::Serialize;

use crate::bucket::Granularity;
use crate::error::{DashError, Result};
use crate::feed::CacheStatus;
use crate::format::thousands;
use crate::heatmap::Heatmap;
use crate::shares::Share;
use crate::snapshot::Row;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Line,
    Bar,
    Area,
    Pie,
    Heatmap,
    /// 100% stacked area; values are per-bucket percentages.
    StackedArea,
}

/// A row sequence for one chart plus the parameters that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub kind: ChartKind,
    pub x: String,
    pub y: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub rows: Vec<Row>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub granularity: Option<Granularity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_n: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricDisplay {
    pub label: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl MetricDisplay {
    pub fn new(label: &str, value: Option<f64>, decimals: usize, unit: Option<&str>) -> Self {
        Self {
            label: label.to_string(),
            value: value.map_or_else(|| "n/a".to_string(), |v| thousands(v, decimals)),
            unit: unit.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum SectionBody {
    Metrics(Vec<MetricDisplay>),
    Chart(ChartData),
    Shares(Vec<Share>),
    Heatmap(Heatmap),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SectionView {
    Ready { body: SectionBody, cache: CacheStatus },
    /// Upstream returned zero rows.
    Empty,
    Unavailable { kind: String, reason: String },
}

impl SectionView {
    pub fn unavailable(err: &DashError) -> Self {
        SectionView::Unavailable {
            kind: err.kind().to_string(),
            reason: err.to_string(),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, SectionView::Ready { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionRender {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub granularity: Option<Granularity>,
    #[serde(flatten)]
    pub view: SectionView,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageView {
    pub page: String,
    pub title: String,
    pub sections: Vec<SectionRender>,
}

impl PageView {
    pub fn section(&self, id: &str) -> Option<&SectionRender> {
        self.sections.iter().find(|s| s.id == id)
    }

    pub fn unavailable_count(&self) -> usize {
        self.sections
            .iter()
            .filter(|s| matches!(s.view, SectionView::Unavailable { .. }))
            .count()
    }
}

pub trait Renderer {
    fn render(&self, page: &PageView) -> Result<String>;
}

pub struct JsonRenderer {
    pub pretty: bool,
}

impl Renderer for JsonRenderer {
    fn render(&self, page: &PageView) -> Result<String> {
        let out = if self.pretty {
            serde_json::to_string_pretty(page)
        } else {
            serde_json::to_string(page)
        };
        out.map_err(|e| DashError::config(format!("render {}: {}", page.page, e)))
    }
}

/// One line per section; metrics are printed inline, charts summarized.
pub struct TextRenderer;

impl Renderer for TextRenderer {
    fn render(&self, page: &PageView) -> Result<String> {
        let mut out = format!("# {}\n", page.title);
        for section in &page.sections {
            out.push_str(&format!("\n## {}", section.title));
            if let Some(g) = section.granularity {
                out.push_str(&format!(" [{}]", g));
            }
            out.push('\n');
            match &section.view {
                SectionView::Ready { body, cache } => {
                    match body {
                        SectionBody::Metrics(metrics) => {
                            for m in metrics {
                                match &m.unit {
                                    Some(unit) => out.push_str(&format!("  {}: {} {}\n", m.label, m.value, unit)),
                                    None => out.push_str(&format!("  {}: {}\n", m.label, m.value)),
                                }
                            }
                        }
                        SectionBody::Chart(chart) => out.push_str(&format!(
                            "  {:?} chart of {} over {} ({} rows)\n",
                            chart.kind,
                            chart.y.join(", "),
                            chart.x,
                            chart.rows.len()
                        )),
                        SectionBody::Shares(shares) => {
                            for s in shares {
                                out.push_str(&format!("  {}: {:.1}%\n", s.label, s.percent));
                            }
                        }
                        SectionBody::Heatmap(h) => out.push_str(&format!(
                            "  heatmap of {} ({} days x 24 hours)\n",
                            h.measure,
                            h.days.len()
                        )),
                    }
                    if *cache == CacheStatus::Stale {
                        out.push_str("  (stale data)\n");
                    }
                }
                SectionView::Empty => out.push_str("  no data\n"),
                SectionView::Unavailable { reason, .. } => {
                    out.push_str(&format!("  data unavailable: {}\n", reason))
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::QueryId;

    fn sample_page() -> PageView {
        PageView {
            page: "macro".to_string(),
            title: "Macro".to_string(),
            sections: vec![
                SectionRender {
                    id: "blocks_overview".to_string(),
                    title: "Blocks".to_string(),
                    granularity: None,
                    view: SectionView::Ready {
                        body: SectionBody::Metrics(vec![MetricDisplay::new(
                            "Total Blocks",
                            Some(1234567.0),
                            0,
                            None,
                        )]),
                        cache: CacheStatus::Fresh,
                    },
                },
                SectionRender {
                    id: "prices".to_string(),
                    title: "Price".to_string(),
                    granularity: Some(Granularity::Weekly),
                    view: SectionView::unavailable(&DashError::fetch(
                        QueryId::PricesDaily,
                        "unreachable",
                    )),
                },
            ],
        }
    }

    #[test]
    fn test_metric_display_formats() {
        let m = MetricDisplay::new("Average TPS", Some(3.14159), 2, Some("tx/s"));
        assert_eq!(m.value, "3.14");
        assert_eq!(m.unit.as_deref(), Some("tx/s"));
        assert_eq!(MetricDisplay::new("x", None, 0, None).value, "n/a");
    }

    #[test]
    fn test_json_shape() {
        let json = JsonRenderer { pretty: false }.render(&sample_page()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        let sections = parsed["sections"].as_array().unwrap();
        assert_eq!(sections[0]["state"], "ready");
        assert_eq!(sections[0]["cache"], "fresh");
        assert_eq!(sections[0]["body"]["type"], "metrics");
        assert_eq!(sections[0]["body"]["data"][0]["value"], "1,234,567");
        assert_eq!(sections[1]["state"], "unavailable");
        assert_eq!(sections[1]["kind"], "fetch");
        assert_eq!(sections[1]["granularity"], "weekly");
    }

    #[test]
    fn test_text_renderer_marks_unavailable() {
        let text = TextRenderer.render(&sample_page()).unwrap();
        assert!(text.contains("Total Blocks: 1,234,567"));
        assert!(text.contains("data unavailable"));
        assert_eq!(sample_page().unavailable_count(), 1);
    }
}
