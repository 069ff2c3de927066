use crate::aggregate::ReducerMap;
use crate::catalog::QueryId;
use crate::render::ChartKind;

use super::{metric, SectionDef, SectionSpec};

fn share(id: &'static str, title: &'static str, query: QueryId, category: &'static str, value: &'static str) -> SectionDef {
    SectionDef::new(
        id,
        title,
        query,
        SectionSpec::Shares {
            category,
            value,
            top_n: None,
        },
    )
}

pub(super) fn sections() -> Vec<SectionDef> {
    vec![
        SectionDef::new(
            "airdrops_overview",
            "Airdrop Overview",
            QueryId::AirdropsOverview,
            SectionSpec::Metrics(vec![
                metric("Eligible Users", "EligibleUsers", 0, None),
                metric("Allocated OP Tokens", "AllocatedTokens", 0, Some("OP")),
                metric("Airdrop Receivers", "Receivers", 0, None),
                metric("Airdropped OP Tokens", "Amount", 0, Some("OP")),
                metric("Claimed Users", "ClaimedUsers", 0, Some("%")),
                metric("Claimed OP Tokens", "ClaimedAmount", 0, Some("%")),
            ]),
        ),
        share(
            "holdings_claimers_share",
            "Share of Claimers",
            QueryId::AirdropsHoldings,
            "Status",
            "Claimers",
        ),
        SectionDef::new(
            "holdings_average",
            "Average Holding Volume",
            QueryId::AirdropsHoldings,
            SectionSpec::Breakdown {
                kind: ChartKind::Bar,
                category: "Status",
                y: vec!["HoldingsAverage"],
            },
        ),
        share(
            "holdings_volume_share",
            "Share of Holding Volume",
            QueryId::AirdropsHoldings,
            "Status",
            "Volume",
        ),
        SectionDef::new(
            "airdrops_over_time",
            "Airdropped Amount and Receivers",
            QueryId::AirdropsDaily,
            SectionSpec::TimeSeries {
                kind: ChartKind::Line,
                y: vec!["Amount", "Receivers"],
                reducers: ReducerMap::sum_all(&["Amount", "Receivers"]),
            },
        ),
        share(
            "delegations_share",
            "Share of Total Delegations",
            QueryId::DelegationsOverview,
            "Type",
            "Delegations",
        ),
        share(
            "delegators_share",
            "Share of Total Delegators",
            QueryId::DelegationsOverview,
            "Type",
            "Delegators",
        ),
        share(
            "delegates_share",
            "Share of Total Delegates",
            QueryId::DelegationsOverview,
            "Type",
            "Delegates",
        ),
        SectionDef::new(
            "delegations_over_time",
            "Delegation Activity",
            QueryId::DelegationsDaily,
            SectionSpec::CategorySeries {
                kind: ChartKind::Line,
                category: "Type",
                y: vec!["Delegations", "Delegators", "Delegates"],
                reducers: ReducerMap::sum_all(&["Delegations", "Delegators", "Delegates"]),
                top_n: None,
            },
        ),
        SectionDef::new(
            "top_delegates",
            "Total Delegated OP of Top Delegates",
            QueryId::DelegationsDelegates,
            SectionSpec::Ranking {
                kind: ChartKind::Bar,
                category: "Delegate",
                y: vec!["Amount"],
                rank_by: "Amount",
                limit: 20,
                collapse: None,
            },
        ),
    ]
}
