use crate::aggregate::ReducerMap;
use crate::catalog::QueryId;
use crate::render::ChartKind;

use super::{metric, SectionDef, SectionSpec};

/// Daily fee figures bucketed. Per-transaction averages are weighted by
/// transaction count, per-block figures by block count.
fn fee_reducers() -> ReducerMap {
    ReducerMap::sum_all(&["Blocks", "Transactions", "Fees", "Gas"])
        .weighted_mean("FeeAverage", "Transactions")
        .weighted_mean("FeeMedian", "Transactions")
        .weighted_mean("GasAverage", "Transactions")
        .weighted_mean("GasMedian", "Transactions")
        .weighted_mean("GasPriceAverage", "Transactions")
        .weighted_mean("GasPriceMedian", "Transactions")
        .weighted_mean("Fees/Block", "Blocks")
        .weighted_mean("Gas/Block", "Blocks")
}

fn series(id: &'static str, title: &'static str, y: Vec<&'static str>) -> SectionDef {
    SectionDef::new(
        id,
        title,
        QueryId::TransactionsDaily,
        SectionSpec::TimeSeries {
            kind: ChartKind::Line,
            y,
            reducers: fee_reducers(),
        },
    )
}

fn heatmap(id: &'static str, title: &'static str, measure: &'static str) -> SectionDef {
    SectionDef::new(
        id,
        title,
        QueryId::TransactionsHeatmap,
        SectionSpec::Heatmap { measure },
    )
}

pub(super) fn sections() -> Vec<SectionDef> {
    vec![
        SectionDef::new(
            "fees_overview",
            "Overview",
            QueryId::TransactionsOverview,
            SectionSpec::Metrics(vec![
                metric("Total Transaction Fees", "Fees", 0, Some("USD")),
                metric("Total Gas Used", "Gas", 0, Some("gas")),
                metric("Maximum Gas Price", "GasPriceMax", 0, Some("gwei")),
                metric("Average Fee Amount", "FeeAverage", 2, Some("USD")),
                metric("Average Gas Amount", "GasAverage", 0, Some("gas")),
                metric("Average Gas Price", "GasPriceAverage", 4, Some("gwei")),
                metric("Median Fee Amount", "FeeMedian", 4, Some("USD")),
                metric("Median Gas Amount", "GasMedian", 0, Some("gas")),
                metric("Median Gas Price", "GasPriceMedian", 4, Some("gwei")),
                metric("Average Fees/Block", "Fees/Block", 2, Some("USD")),
                metric("Average Gas/Block", "Gas/Block", 0, Some("gas")),
                metric("Minimum Gas Price", "GasPriceMin", 2, Some("gwei")),
            ]),
        ),
        series("fees_over_time", "Fees and Gas Used", vec!["Fees", "Gas"]),
        series("fee_amounts_over_time", "Average and Median Fee", vec!["FeeAverage", "FeeMedian"]),
        series("gas_amounts_over_time", "Average and Median Gas", vec!["GasAverage", "GasMedian"]),
        series(
            "gas_price_over_time",
            "Average and Median Gas Price",
            vec!["GasPriceAverage", "GasPriceMedian"],
        ),
        series("per_block_over_time", "Fees and Gas per Block", vec!["Fees/Block", "Gas/Block"]),
        heatmap("fees_heatmap", "Heatmap of Transaction Fees", "Fees"),
        heatmap("fee_average_heatmap", "Heatmap of Average Fee", "FeeAverage"),
        heatmap("fee_median_heatmap", "Heatmap of Median Fee", "FeeMedian"),
        heatmap("fees_per_block_heatmap", "Heatmap of Average Fees/Block", "Fees/Block"),
        heatmap("gas_heatmap", "Heatmap of Gas Used", "Gas"),
        heatmap("gas_average_heatmap", "Heatmap of Average Gas Used", "GasAverage"),
        heatmap("gas_median_heatmap", "Heatmap of Median Gas Used", "GasMedian"),
        heatmap("gas_per_block_heatmap", "Heatmap of Average Gas/Block", "Gas/Block"),
    ]
}
