use crate::aggregate::ReducerMap;
use crate::catalog::QueryId;
use crate::render::ChartKind;

use super::{metric, SectionDef, SectionSpec, TopNSpec};

const PROTOCOLS_SHOWN: usize = 5;
const TOKENS_SHOWN: usize = 3;
const TOKEN_SHARES_SHOWN: usize = 5;
const TOKEN_AMOUNTS_SHOWN: usize = 10;

/// Flows add up; bridged-amount averages are re-weighted by transactions.
fn bridge_reducers() -> ReducerMap {
    ReducerMap::sum_all(&["Transactions", "Bridgers", "Volume"])
        .weighted_mean("AmountAverage", "Transactions")
        .weighted_mean("AmountMedian", "Transactions")
}

fn by_volume(n: usize) -> Option<TopNSpec> {
    Some(TopNSpec {
        n,
        rank_by: "Volume",
    })
}

fn daily(id: &'static str, title: &'static str, kind: ChartKind, y: Vec<&'static str>) -> SectionDef {
    SectionDef::new(
        id,
        title,
        QueryId::BridgesDaily,
        SectionSpec::TimeSeries {
            kind,
            y,
            reducers: bridge_reducers(),
        },
    )
}

fn per_category(
    id: &'static str,
    title: &'static str,
    query: QueryId,
    category: &'static str,
    kind: ChartKind,
    y: Vec<&'static str>,
    top: usize,
) -> SectionDef {
    SectionDef::new(
        id,
        title,
        query,
        SectionSpec::CategorySeries {
            kind,
            category,
            y,
            reducers: bridge_reducers(),
            top_n: by_volume(top),
        },
    )
}

fn share(
    id: &'static str,
    title: &'static str,
    query: QueryId,
    category: &'static str,
    value: &'static str,
    top: Option<usize>,
) -> SectionDef {
    SectionDef::new(
        id,
        title,
        query,
        SectionSpec::Shares {
            category,
            value,
            // Each pie ranks by the column it plots.
            top_n: top.map(|n| TopNSpec { n, rank_by: value }),
        },
    )
}

fn token_amount(id: &'static str, title: &'static str, column: &'static str) -> SectionDef {
    SectionDef::new(
        id,
        title,
        QueryId::BridgesTokensOverview,
        SectionSpec::Ranking {
            kind: ChartKind::Bar,
            category: "Token",
            y: vec![column],
            rank_by: column,
            limit: TOKEN_AMOUNTS_SHOWN,
            collapse: Some(ReducerMap::new().weighted_mean(column, "Transactions")),
        },
    )
}

pub(super) fn sections() -> Vec<SectionDef> {
    use ChartKind::*;
    use QueryId::{BridgesProtocolsDaily, BridgesProtocolsOverview, BridgesTokensDaily, BridgesTokensOverview};

    vec![
        SectionDef::new(
            "bridges_overview",
            "Overview of Rainbow Bridge",
            QueryId::BridgesOverview,
            SectionSpec::Metrics(vec![
                metric("Total Bridged Volume", "Volume", 0, Some("USD")),
                metric("Average Bridged Amount", "AmountAverage", 0, Some("USD")),
                metric("Total Bridge Transactions", "Transactions", 0, None),
                metric("Median Bridged Amount", "AmountMedian", 0, Some("USD")),
                metric("Total Bridgers", "Bridgers", 0, None),
                metric("Bridge Protocols", "Protocols", 0, None),
            ]),
        ),
        daily("bridges_volume_over_time", "Bridged Volume Over Time", Area, vec!["Volume"]),
        daily(
            "bridges_activity_over_time",
            "Bridge Transactions and Bridgers",
            Bar,
            vec!["Transactions", "Bridgers"],
        ),
        daily(
            "bridges_amounts_over_time",
            "Average and Median Bridged Amount",
            Line,
            vec!["AmountAverage", "AmountMedian"],
        ),
        share("protocols_volume_share", "Share of Total Bridged Volume", BridgesProtocolsOverview, "Protocol", "Volume", None),
        share("protocols_transactions_share", "Share of Total Transactions", BridgesProtocolsOverview, "Protocol", "Transactions", None),
        share("protocols_bridgers_share", "Share of Total Bridgers", BridgesProtocolsOverview, "Protocol", "Bridgers", None),
        per_category(
            "protocols_over_time",
            "Protocol Activity Over Time",
            BridgesProtocolsDaily,
            "Protocol",
            Bar,
            vec!["Volume", "Transactions", "Bridgers"],
            PROTOCOLS_SHOWN,
        ),
        per_category(
            "protocols_amounts_over_time",
            "Bridged Amount per Protocol",
            BridgesProtocolsDaily,
            "Protocol",
            Line,
            vec!["AmountAverage", "AmountMedian"],
            PROTOCOLS_SHOWN,
        ),
        share(
            "tokens_volume_share",
            "Share of Total Bridged Volume",
            BridgesTokensOverview,
            "Token",
            "Volume",
            Some(TOKEN_SHARES_SHOWN),
        ),
        share(
            "tokens_transactions_share",
            "Share of Total Transactions",
            BridgesTokensOverview,
            "Token",
            "Transactions",
            Some(TOKEN_SHARES_SHOWN),
        ),
        share(
            "tokens_bridgers_share",
            "Share of Total Bridgers",
            BridgesTokensOverview,
            "Token",
            "Bridgers",
            Some(TOKEN_SHARES_SHOWN),
        ),
        token_amount("tokens_amount_average", "Average Bridged Amount", "AmountAverage"),
        token_amount("tokens_amount_median", "Median Bridged Amount", "AmountMedian"),
        per_category(
            "tokens_over_time",
            "Token Activity Over Time",
            BridgesTokensDaily,
            "Token",
            Bar,
            vec!["Volume", "Transactions", "Bridgers"],
            TOKENS_SHOWN,
        ),
        per_category(
            "tokens_share_over_time",
            "Token Share Over Time",
            BridgesTokensDaily,
            "Token",
            StackedArea,
            vec!["Volume", "Transactions", "Bridgers"],
            TOKENS_SHOWN,
        ),
        per_category(
            "tokens_amounts_over_time",
            "Bridged Amount per Token",
            BridgesTokensDaily,
            "Token",
            Line,
            vec!["AmountAverage", "AmountMedian"],
            TOKENS_SHOWN,
        ),
    ]
}
