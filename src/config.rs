use std::collections::HashMap;
use std::path::Path;

use crate::bucket::Granularity;
use crate::catalog::{Catalog, DEFAULT_API_BASE};
use crate::error::{DashError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base: String,
    pub api_key: Option<String>,
    pub cache_ttl_secs: u64,
    pub http_timeout_secs: u64,
    /// Serve the last good snapshot when a refresh fails.
    pub stale_on_error: bool,
    /// JSON file mapping query names to replacement URLs.
    pub catalog_path: Option<String>,
    pub default_granularity: Granularity,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: None,
            cache_ttl_secs: 3600,
            http_timeout_secs: 30,
            stale_on_error: true,
            catalog_path: None,
            default_granularity: Granularity::Daily,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_base: std::env::var("OPDASH_API_BASE").unwrap_or(defaults.api_base),
            api_key: std::env::var("OPDASH_API_KEY").ok().filter(|k| !k.is_empty()),
            cache_ttl_secs: std::env::var("OPDASH_CACHE_TTL_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(defaults.cache_ttl_secs),
            http_timeout_secs: std::env::var("OPDASH_HTTP_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(defaults.http_timeout_secs),
            stale_on_error: std::env::var("OPDASH_STALE_ON_ERROR").map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes")).unwrap_or(defaults.stale_on_error),
            catalog_path: std::env::var("OPDASH_CATALOG").ok().filter(|p| !p.is_empty()),
            default_granularity: std::env::var("OPDASH_DEFAULT_INTERVAL").ok().and_then(|v| v.parse().ok()).unwrap_or(defaults.default_granularity),
        }
    }

    /// Build and validate the query catalog, applying any override file.
    pub fn catalog(&self) -> Result<Catalog> {
        let mut catalog = Catalog::with_base(&self.api_base)?;
        if let Some(path) = &self.catalog_path {
            catalog = catalog.with_overrides(&load_overrides(Path::new(path))?)?;
        }
        catalog.validate()?;
        Ok(catalog)
    }
}

pub fn load_overrides(path: &Path) -> Result<HashMap<String, String>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| DashError::config(format!("read {}: {}", path.display(), e)))?;
    serde_json::from_str(&raw)
        .map_err(|e| DashError::config(format!("parse {}: {}", path.display(), e)))
}
