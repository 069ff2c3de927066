//! Query catalog: every upstream result set the dashboard reads, the URL it
//! lives at, and the columns it promises.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{DashError, Result};

pub const DEFAULT_API_BASE: &str = "https://api.flipsidecrypto.com/api/v2/queries";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QueryId {
    PricesDaily,
    BlocksOverview,
    BlocksDaily,
    TransactionsOverview,
    TransactionsDaily,
    TransactionsHeatmap,
    TransactionsStatusOverview,
    TransactionsStatusDaily,
    AirdropsOverview,
    AirdropsDaily,
    AirdropsHoldings,
    DelegationsOverview,
    DelegationsDaily,
    DelegationsDelegates,
    BridgesOverview,
    BridgesDaily,
    BridgesProtocolsOverview,
    BridgesProtocolsDaily,
    BridgesTokensOverview,
    BridgesTokensDaily,
}

impl QueryId {
    pub const ALL: [QueryId; 20] = [
        QueryId::PricesDaily,
        QueryId::BlocksOverview,
        QueryId::BlocksDaily,
        QueryId::TransactionsOverview,
        QueryId::TransactionsDaily,
        QueryId::TransactionsHeatmap,
        QueryId::TransactionsStatusOverview,
        QueryId::TransactionsStatusDaily,
        QueryId::AirdropsOverview,
        QueryId::AirdropsDaily,
        QueryId::AirdropsHoldings,
        QueryId::DelegationsOverview,
        QueryId::DelegationsDaily,
        QueryId::DelegationsDelegates,
        QueryId::BridgesOverview,
        QueryId::BridgesDaily,
        QueryId::BridgesProtocolsOverview,
        QueryId::BridgesProtocolsDaily,
        QueryId::BridgesTokensOverview,
        QueryId::BridgesTokensDaily,
    ];

    /// Display name, also the key used in catalog override files.
    pub fn name(&self) -> &'static str {
        match self {
            QueryId::PricesDaily => "Prices Daily",
            QueryId::BlocksOverview => "Blocks Overview",
            QueryId::BlocksDaily => "Blocks Daily",
            QueryId::TransactionsOverview => "Transactions Overview",
            QueryId::TransactionsDaily => "Transactions Daily",
            QueryId::TransactionsHeatmap => "Transactions Heatmap",
            QueryId::TransactionsStatusOverview => "Transactions Status Overview",
            QueryId::TransactionsStatusDaily => "Transactions Status Daily",
            QueryId::AirdropsOverview => "Airdrops Overview",
            QueryId::AirdropsDaily => "Airdrops Daily",
            QueryId::AirdropsHoldings => "Airdrops Holdings",
            QueryId::DelegationsOverview => "Delegations Overview",
            QueryId::DelegationsDaily => "Delegations Daily",
            QueryId::DelegationsDelegates => "Delegations Delegates",
            QueryId::BridgesOverview => "Bridges Overview",
            QueryId::BridgesDaily => "Bridges Daily",
            QueryId::BridgesProtocolsOverview => "Bridges Protocols Overview",
            QueryId::BridgesProtocolsDaily => "Bridges Protocols Daily",
            QueryId::BridgesTokensOverview => "Bridges Tokens Overview",
            QueryId::BridgesTokensDaily => "Bridges Tokens Daily",
        }
    }

    pub fn from_name(name: &str) -> Option<QueryId> {
        let needle = name.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|q| q.name().eq_ignore_ascii_case(needle))
    }

    /// Upstream saved-query identifier.
    fn query_uuid(&self) -> &'static str {
        match self {
            QueryId::PricesDaily => "7497aa52-9d5a-4f87-9181-3460b9454598",
            QueryId::BlocksOverview => "ae07b6ca-1ed1-4f33-9962-82248051615b",
            QueryId::BlocksDaily => "305b2656-bb71-4010-b8b5-8bba63251aa4",
            QueryId::TransactionsOverview => "df60d653-c930-4c8b-923b-d4dfee9f22a9",
            QueryId::TransactionsDaily => "f3765691-7645-4bf8-81a7-488730e7536e",
            QueryId::TransactionsHeatmap => "656cd42b-7df3-492f-8046-6281fa027954",
            QueryId::TransactionsStatusOverview => "d38298c5-e2b8-46c7-8e1e-3df5e1b1cebe",
            QueryId::TransactionsStatusDaily => "caa89120-cdd2-4c04-8385-3a848a4d7f6c",
            QueryId::AirdropsOverview => "c9975ac7-ff80-4727-9871-50854a4d09c4",
            QueryId::AirdropsDaily => "ed708971-8811-46cb-b905-414203330493",
            QueryId::AirdropsHoldings => "9a7e04a7-00e2-4326-a988-eecdc0de73a7",
            QueryId::DelegationsOverview => "cc6eaf1d-b3db-4899-9ad9-16e1ca45bee4",
            QueryId::DelegationsDaily => "5a09b40d-0002-40df-a895-0e1d27d8bc24",
            QueryId::DelegationsDelegates => "e4db6425-591c-497d-95a9-59baf46c72b1",
            QueryId::BridgesOverview => "0eb7ce61-825c-4047-8845-6e56950f0c46",
            QueryId::BridgesDaily => "38b44e33-6817-4186-814d-423ca30a0470",
            QueryId::BridgesProtocolsOverview => "d74f6b01-ad6e-42a5-a56a-f9d59b71fbcb",
            QueryId::BridgesProtocolsDaily => "1fda50b0-f12a-4b8b-b5e4-48777a4a7801",
            QueryId::BridgesTokensOverview => "13c6741f-4097-47f8-bacf-fec9f105ca6e",
            QueryId::BridgesTokensDaily => "15172a48-0ee7-4926-b05d-d4bf579127d6",
        }
    }

    /// Columns the upstream query is contracted to return.
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            QueryId::PricesDaily => &["Date", "Price", "Change"],
            QueryId::BlocksOverview => &["Blocks", "BlockTime"],
            QueryId::BlocksDaily => &["Date", "Blocks", "Transactions", "Validators", "BlockTime"],
            QueryId::TransactionsOverview => &[
                "Transactions", "TPS", "Users", "Users/Day", "Fees", "FeeAverage", "FeeMedian",
                "Fees/Block", "Gas", "GasAverage", "GasMedian", "Gas/Block", "GasPriceAverage",
                "GasPriceMedian", "GasPriceMax", "GasPriceMin",
            ],
            QueryId::TransactionsDaily => &[
                "Date", "Blocks", "Transactions", "Users", "TPS", "Fees", "FeeAverage",
                "FeeMedian", "Fees/Block", "Gas", "GasAverage", "GasMedian", "Gas/Block",
                "GasPriceAverage", "GasPriceMedian",
            ],
            QueryId::TransactionsHeatmap => &[
                "Day", "Hour", "Transactions", "Blocks", "Users", "Fees", "FeeAverage",
                "FeeMedian", "Fees/Block", "Gas", "GasAverage", "GasMedian", "Gas/Block",
            ],
            QueryId::TransactionsStatusOverview => &["Status", "Transactions", "Users", "Fees"],
            QueryId::TransactionsStatusDaily => &["Date", "Status", "Transactions", "Users", "Fees"],
            QueryId::AirdropsOverview => &[
                "EligibleUsers", "AllocatedTokens", "Receivers", "Amount", "ClaimedUsers",
                "ClaimedAmount",
            ],
            QueryId::AirdropsDaily => &["Date", "Amount", "Receivers"],
            QueryId::AirdropsHoldings => &["Status", "Claimers", "HoldingsAverage", "Volume"],
            QueryId::DelegationsOverview => &["Type", "Delegations", "Delegators", "Delegates"],
            QueryId::DelegationsDaily => &["Date", "Type", "Delegations", "Delegators", "Delegates"],
            QueryId::DelegationsDelegates => &["Delegate", "Amount"],
            QueryId::BridgesOverview => &[
                "Volume", "AmountAverage", "AmountMedian", "Transactions", "Bridgers", "Protocols",
            ],
            QueryId::BridgesDaily => &[
                "Date", "Transactions", "Bridgers", "Volume", "AmountAverage", "AmountMedian",
            ],
            QueryId::BridgesProtocolsOverview => &["Protocol", "Volume", "Transactions", "Bridgers"],
            QueryId::BridgesProtocolsDaily => &[
                "Date", "Protocol", "Transactions", "Bridgers", "Volume", "AmountAverage",
                "AmountMedian",
            ],
            QueryId::BridgesTokensOverview => &[
                "Token", "Volume", "Transactions", "Bridgers", "AmountAverage", "AmountMedian",
            ],
            QueryId::BridgesTokensDaily => &[
                "Date", "Token", "Transactions", "Bridgers", "Volume", "AmountAverage",
                "AmountMedian",
            ],
        }
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a query lives and what it returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuerySpec {
    pub id: QueryId,
    pub url: Url,
    pub columns: Vec<String>,
}

/// Lookup table from query identifier to endpoint plus expected schema.
#[derive(Debug, Clone)]
pub struct Catalog {
    specs: BTreeMap<QueryId, QuerySpec>,
}

impl Catalog {
    /// Catalog of every known query served from `base`
    /// (`<base>/<uuid>/data/latest`).
    pub fn with_base(base: &str) -> Result<Self> {
        let base = base.trim_end_matches('/');
        let mut specs = BTreeMap::new();
        for id in QueryId::ALL {
            let raw = format!("{}/{}/data/latest", base, id.query_uuid());
            let url = Url::parse(&raw)
                .map_err(|e| DashError::config(format!("{}: bad url {}: {}", id, raw, e)))?;
            specs.insert(
                id,
                QuerySpec {
                    id,
                    url,
                    columns: id.columns().iter().map(|c| c.to_string()).collect(),
                },
            );
        }
        Ok(Self { specs })
    }

    pub fn flipside() -> Result<Self> {
        Self::with_base(DEFAULT_API_BASE)
    }

    /// Replace endpoint URLs by query name.
    pub fn with_overrides(mut self, overrides: &HashMap<String, String>) -> Result<Self> {
        for (name, raw) in overrides {
            let id = QueryId::from_name(name)
                .ok_or_else(|| DashError::config(format!("unknown query `{}`", name)))?;
            let url = Url::parse(raw)
                .map_err(|e| DashError::config(format!("{}: bad url {}: {}", id, raw, e)))?;
            if let Some(spec) = self.specs.get_mut(&id) {
                spec.url = url;
            }
        }
        Ok(self)
    }

    /// Startup check: every query present, http(s) endpoints, non-empty
    /// schemas, and no two queries sharing one endpoint.
    pub fn validate(&self) -> Result<()> {
        let mut seen: HashSet<&str> = HashSet::new();
        for id in QueryId::ALL {
            let spec = self.get(id)?;
            if !matches!(spec.url.scheme(), "http" | "https") {
                return Err(DashError::config(format!(
                    "{}: unsupported scheme `{}`",
                    id,
                    spec.url.scheme()
                )));
            }
            if spec.columns.is_empty() {
                return Err(DashError::config(format!("{}: empty schema", id)));
            }
            if !seen.insert(spec.url.as_str()) {
                return Err(DashError::config(format!(
                    "{}: endpoint {} already used by another query",
                    id, spec.url
                )));
            }
        }
        Ok(())
    }

    pub fn get(&self, id: QueryId) -> Result<&QuerySpec> {
        self.specs
            .get(&id)
            .ok_or_else(|| DashError::config(format!("query {} not in catalog", id)))
    }

    pub fn iter(&self) -> impl Iterator<Item = &QuerySpec> {
        self.specs.values()
    }
}
