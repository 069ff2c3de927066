use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::catalog::QuerySpec;
use crate::error::{DashError, Result};
use crate::snapshot::Snapshot;

/// Something that can produce a fresh snapshot for a query.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch(&self, spec: &QuerySpec) -> Result<Snapshot>;
}

/// Plain HTTP GET against the query's endpoint.
pub struct HttpSource {
    client: Client,
    api_key: Option<String>,
}

impl HttpSource {
    pub fn new(timeout: Duration, api_key: Option<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_key,
        }
    }
}

#[async_trait]
impl SnapshotSource for HttpSource {
    async fn fetch(&self, spec: &QuerySpec) -> Result<Snapshot> {
        let mut req = self.client.get(spec.url.clone());
        if let Some(key) = &self.api_key {
            req = req.header("x-api-key", key);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| DashError::fetch(spec.id, describe(&e)))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(DashError::fetch(spec.id, format!("http status {}", status)));
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| DashError::fetch(spec.id, describe(&e)))?;
        Snapshot::from_json_bytes(spec.id, &bytes)
    }
}

fn describe(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("timed out: {}", err)
    } else if err.is_connect() {
        format!("unreachable: {}", err)
    } else {
        err.to_string()
    }
}
