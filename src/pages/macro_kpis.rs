use crate::aggregate::ReducerMap;
use crate::catalog::QueryId;
use crate::render::ChartKind;

use super::{metric, SectionDef, SectionSpec};

pub(super) fn sections() -> Vec<SectionDef> {
    vec![
        SectionDef::new(
            "blocks_overview",
            "Blocks",
            QueryId::BlocksOverview,
            SectionSpec::Metrics(vec![
                metric("Total Blocks", "Blocks", 0, None),
                metric("Average Block Time", "BlockTime", 2, Some("seconds")),
            ]),
        ),
        SectionDef::new(
            "transactions_overview",
            "Transactions",
            QueryId::TransactionsOverview,
            SectionSpec::Metrics(vec![
                metric("Total Transactions", "Transactions", 0, None),
                metric("Average TPS", "TPS", 2, None),
                metric("Total Unique Addresses", "Users", 0, None),
                metric("Average Daily Active Users", "Users/Day", 0, None),
            ]),
        ),
        SectionDef::new(
            "price_over_time",
            "OP Price",
            QueryId::PricesDaily,
            SectionSpec::TimeSeries {
                kind: ChartKind::Line,
                y: vec!["Price", "Change"],
                reducers: ReducerMap::mean_all(&["Price", "Change"]),
            },
        ),
        SectionDef::new(
            "blocks_over_time",
            "Blocks and Block Time",
            QueryId::BlocksDaily,
            SectionSpec::TimeSeries {
                kind: ChartKind::Line,
                y: vec!["Blocks", "BlockTime"],
                reducers: ReducerMap::sum_all(&["Blocks", "Transactions"])
                    // Validator count is a level, not a flow.
                    .mean("Validators")
                    .weighted_mean("BlockTime", "Blocks"),
            },
        ),
        SectionDef::new(
            "transactions_over_time",
            "Transactions and TPS",
            QueryId::TransactionsDaily,
            SectionSpec::TimeSeries {
                kind: ChartKind::Line,
                y: vec!["Transactions", "TPS"],
                reducers: ReducerMap::sum_all(&["Blocks", "Transactions", "Users"]).mean("TPS"),
            },
        ),
        SectionDef::new(
            "users_over_time",
            "Active Addresses",
            QueryId::TransactionsDaily,
            SectionSpec::TimeSeries {
                kind: ChartKind::Area,
                y: vec!["Users"],
                reducers: ReducerMap::sum_all(&["Users"]),
            },
        ),
        SectionDef::new(
            "transactions_heatmap",
            "Heatmap of Transactions",
            QueryId::TransactionsHeatmap,
            SectionSpec::Heatmap { measure: "Transactions" },
        ),
        SectionDef::new(
            "blocks_heatmap",
            "Heatmap of Blocks",
            QueryId::TransactionsHeatmap,
            SectionSpec::Heatmap { measure: "Blocks" },
        ),
        SectionDef::new(
            "users_heatmap",
            "Heatmap of Active Addresses",
            QueryId::TransactionsHeatmap,
            SectionSpec::Heatmap { measure: "Users" },
        ),
        SectionDef::new(
            "status_transactions_share",
            "Share of Total Transactions",
            QueryId::TransactionsStatusOverview,
            SectionSpec::Shares {
                category: "Status",
                value: "Transactions",
                top_n: None,
            },
        ),
        SectionDef::new(
            "status_users_share",
            "Share of Total Users",
            QueryId::TransactionsStatusOverview,
            SectionSpec::Shares {
                category: "Status",
                value: "Users",
                top_n: None,
            },
        ),
        SectionDef::new(
            "status_fees_share",
            "Share of Total Fees",
            QueryId::TransactionsStatusOverview,
            SectionSpec::Shares {
                category: "Status",
                value: "Fees",
                top_n: None,
            },
        ),
        SectionDef::new(
            "status_over_time",
            "Success Rate Over Time",
            QueryId::TransactionsStatusDaily,
            SectionSpec::CategorySeries {
                kind: ChartKind::Line,
                category: "Status",
                y: vec!["Transactions", "Users", "Fees"],
                reducers: ReducerMap::sum_all(&["Transactions", "Users", "Fees"]),
                top_n: None,
            },
        ),
    ]
}
