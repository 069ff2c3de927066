use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::Serialize;

use super::source::{HttpSource, SnapshotSource};
use crate::catalog::{Catalog, QueryId};
use crate::config::Config;
use crate::error::{DashError, Result};
use crate::logging::{log_cache, log_fetch, log_fetch_failed, log_schema_drift, v_str, ProfileScope};
use crate::snapshot::Snapshot;

/// Cached snapshot with the instant it was fetched. Replaced whole on
/// refresh, never edited.
#[derive(Debug, Clone)]
struct CacheEntry {
    snapshot: Arc<Snapshot>,
    fetched_at: Instant,
}

impl CacheEntry {
    fn new(snapshot: Arc<Snapshot>) -> Self {
        Self {
            snapshot,
            fetched_at: Instant::now(),
        }
    }

    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }

    fn age_secs(&self) -> f64 {
        self.fetched_at.elapsed().as_secs_f64()
    }
}

/// How a snapshot was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStatus {
    /// Fetched from upstream on this request.
    Fresh,
    /// Served from a cache entry inside its window.
    Cached,
    /// Refresh failed; served the last good snapshot.
    Stale,
}

#[derive(Debug, Clone)]
pub struct Fetched {
    pub snapshot: Arc<Snapshot>,
    pub status: CacheStatus,
}

/// Snapshot fetcher with a per-query TTL cache.
///
/// Concurrent misses on one query may both hit upstream; the later write
/// wins. The lock is never held across an await.
pub struct SnapshotFetcher {
    source: Arc<dyn SnapshotSource>,
    catalog: Arc<Catalog>,
    cache: Arc<Mutex<HashMap<QueryId, CacheEntry>>>,
    ttl: Duration,
    stale_on_error: bool,
}

impl SnapshotFetcher {
    pub fn new(source: Arc<dyn SnapshotSource>, catalog: Catalog, ttl: Duration) -> Self {
        Self {
            source,
            catalog: Arc::new(catalog),
            cache: Arc::new(Mutex::new(HashMap::new())),
            ttl,
            stale_on_error: true,
        }
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let source = HttpSource::new(
            Duration::from_secs(cfg.http_timeout_secs),
            cfg.api_key.clone(),
        );
        Ok(Self::new(
            Arc::new(source),
            cfg.catalog()?,
            Duration::from_secs(cfg.cache_ttl_secs),
        )
        .with_stale_on_error(cfg.stale_on_error))
    }

    pub fn with_stale_on_error(mut self, enabled: bool) -> Self {
        self.stale_on_error = enabled;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the snapshot for `id`, from cache while fresh, otherwise
    /// fetched synchronously. No retries.
    pub async fn fetch(&self, id: QueryId) -> Result<Fetched> {
        {
            let cache = self.lock(id)?;
            if let Some(entry) = cache.get(&id) {
                if entry.is_fresh(self.ttl) {
                    log_cache(id.name(), "hit", entry.age_secs());
                    return Ok(Fetched {
                        snapshot: entry.snapshot.clone(),
                        status: CacheStatus::Cached,
                    });
                }
                log_cache(id.name(), "expired", entry.age_secs());
            }
        }

        let spec = self.catalog.get(id)?;
        let scope = ProfileScope::with_context("snapshot_fetch", &[("query", v_str(id.name()))]);
        match self.source.fetch(spec).await {
            Ok(snapshot) => {
                let missing = snapshot.missing_columns(&spec.columns);
                if !missing.is_empty() {
                    log_schema_drift(id.name(), &missing);
                }
                log_fetch(
                    id.name(),
                    spec.url.as_str(),
                    snapshot.len(),
                    &snapshot.digest,
                    scope.elapsed_ms(),
                );

                let snapshot = Arc::new(snapshot);
                let mut cache = self.lock(id)?;
                if let Some(prev) = cache.get(&id) {
                    if prev.snapshot.digest == snapshot.digest {
                        log_cache(id.name(), "unchanged", prev.age_secs());
                    }
                }
                cache.insert(id, CacheEntry::new(snapshot.clone()));
                Ok(Fetched {
                    snapshot,
                    status: CacheStatus::Fresh,
                })
            }
            Err(err) => {
                log_fetch_failed(id.name(), &err.to_string());
                if self.stale_on_error {
                    if let Some(entry) = self.lock(id)?.get(&id) {
                        log_cache(id.name(), "stale_served", entry.age_secs());
                        return Ok(Fetched {
                            snapshot: entry.snapshot.clone(),
                            status: CacheStatus::Stale,
                        });
                    }
                }
                Err(err)
            }
        }
    }

    /// Last cached snapshot for `id`, fresh or not.
    pub fn cached(&self, id: QueryId) -> Option<Arc<Snapshot>> {
        self.cache
            .lock()
            .ok()
            .and_then(|c| c.get(&id).map(|e| e.snapshot.clone()))
    }

    /// Drop one entry so the next request re-fetches.
    pub fn invalidate(&self, id: QueryId) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.remove(&id);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }

    fn lock(&self, id: QueryId) -> Result<MutexGuard<'_, HashMap<QueryId, CacheEntry>>> {
        self.cache
            .lock()
            .map_err(|_| DashError::fetch(id, "snapshot cache lock poisoned"))
    }
}
