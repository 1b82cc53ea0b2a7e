//! On-disk sheet cache
//!
//! Stores each fetched CSV body in `<cache_dir>/<product>.json` together with
//! its source and fetch time, so repeated runs do not hit the bucket again
//! until the TTL expires.

use crate::models::Product;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Cached copy of one sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedSheet {
    /// When the sheet was fetched
    pub last_updated: DateTime<Utc>,

    /// URL or path the body came from
    pub source: String,

    /// Raw CSV text
    pub body: String,
}

impl CachedSheet {
    pub fn age(&self) -> chrono::Duration {
        Utc::now().signed_duration_since(self.last_updated)
    }
}

/// Directory of cached sheets with a freshness limit
#[derive(Debug, Clone)]
pub struct CsvCache {
    dir: PathBuf,
    ttl: Duration,
}

impl CsvCache {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn entry_path(&self, product: Product) -> PathBuf {
        self.dir.join(format!("{}.json", product.key()))
    }

    /// Load a fresh entry fetched from `source`
    ///
    /// Entries from another source or older than the TTL are ignored.
    pub fn load(&self, product: Product, source: &str) -> Result<Option<CachedSheet>> {
        let Some(cached) = self.load_any(product)? else {
            return Ok(None);
        };

        if cached.source != source {
            tracing::info!(
                product = product.key(),
                cached = %cached.source,
                wanted = %source,
                "Cached sheet comes from another source, ignoring"
            );
            return Ok(None);
        }

        let age = cached.age();
        let expired = age
            .to_std()
            .map(|age| age > self.ttl)
            .unwrap_or(false);
        if expired {
            tracing::info!(
                product = product.key(),
                "Sheet cache expired ({} hours old, TTL: {} hours)",
                age.num_hours(),
                self.ttl.as_secs() / 3600
            );
            return Ok(None);
        }

        tracing::debug!(
            product = product.key(),
            "Loaded sheet from cache ({} minutes old)",
            age.num_minutes()
        );
        Ok(Some(cached))
    }

    /// Load an entry regardless of age or source (offline use)
    pub fn load_any(&self, product: Product) -> Result<Option<CachedSheet>> {
        let path = self.entry_path(product);

        if !path.exists() {
            tracing::debug!("No sheet cache found at {}", path.display());
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read sheet cache: {}", path.display()))?;

        let cached: CachedSheet = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse sheet cache: {}", path.display()))?;

        Ok(Some(cached))
    }

    /// Save a freshly fetched body
    pub fn save(&self, product: Product, source: &str, body: &str) -> Result<CachedSheet> {
        std::fs::create_dir_all(&self.dir).with_context(|| {
            format!("Failed to create cache directory: {}", self.dir.display())
        })?;

        let cached = CachedSheet {
            last_updated: Utc::now(),
            source: source.to_string(),
            body: body.to_string(),
        };

        let json = serde_json::to_string_pretty(&cached).context("Failed to serialize sheet cache")?;

        let path = self.entry_path(product);
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write sheet cache: {}", path.display()))?;

        tracing::info!(product = product.key(), "Saved sheet to cache");
        Ok(cached)
    }

    /// Remove every cached sheet, returning how many were removed
    pub fn clear(&self) -> Result<usize> {
        let mut removed = 0;
        for product in Product::ALL {
            let path = self.entry_path(product);
            if path.exists() {
                std::fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove sheet cache: {}", path.display()))?;
                removed += 1;
            }
        }

        if removed > 0 {
            tracing::info!("Cleared {} cached sheets", removed);
        }
        Ok(removed)
    }
}
