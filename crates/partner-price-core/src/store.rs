//! Price store with an in-memory sheet cache
//!
//! Sheets are looked up in three places, in order: the in-memory moka cache
//! (keyed by source URL), the on-disk `CsvCache`, and finally the source
//! itself. Parsed sheets are turned into typed `PriceTable`s on every load so
//! data-quality warnings always reach the caller's `LoadReport`.

use crate::calculator::{self, UsageKey};
use crate::config::SourceConfig;
use crate::error::{LoadError, LoadReport, PriceError};
use crate::models::price_table::{BracketTable, PriceTable, ThresholdTable};
use crate::models::{PriceQuote, Product, TableShape};
use crate::normalize::normalize;
use crate::parsers::csv::RawTable;
use crate::source::{fetch_csv, CsvCache};
use chrono::{DateTime, Utc};
use moka::future::Cache;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Upper bound on cached sheets; one per product plus mirrors
const MAX_CACHED_SHEETS: u64 = 32;

/// Parsed sheet held in memory
#[derive(Debug, Clone)]
pub struct CachedTable {
    pub raw: Arc<RawTable>,
    pub fetched_at: DateTime<Utc>,
    pub source: String,
}

impl CachedTable {
    /// Whether the sheet is younger than `ttl`
    ///
    /// Measured from the original fetch, so a copy taken from the disk cache
    /// does not get a new lease in memory.
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        Utc::now()
            .signed_duration_since(self.fetched_at)
            .to_std()
            .map(|age| age <= ttl)
            .unwrap_or(true)
    }

    pub fn info(&self) -> SheetInfo {
        SheetInfo {
            fetched_at: self.fetched_at,
            source: self.source.clone(),
        }
    }
}

/// Where and when a loaded table's sheet was fetched
#[derive(Debug, Clone, PartialEq)]
pub struct SheetInfo {
    pub fetched_at: DateTime<Utc>,
    pub source: String,
}

/// Central access point for price sheets
pub struct PriceStore {
    config: SourceConfig,

    /// On-disk copies of fetched bodies (None if no cache directory is known)
    disk_cache: Option<CsvCache>,

    /// Parsed sheets keyed by source URL
    tables: Cache<String, Arc<CachedTable>>,

    /// Never touch the network; serve from caches only
    offline: bool,
}

impl PriceStore {
    pub fn new(config: SourceConfig) -> Self {
        let tables = Cache::builder()
            .max_capacity(MAX_CACHED_SHEETS)
            .time_to_live(config.cache_ttl())
            .build();

        let disk_cache = match config.cache_dir() {
            Some(dir) => {
                debug!(path = %dir.display(), "Sheet disk cache enabled");
                Some(CsvCache::new(dir, config.cache_ttl()))
            }
            None => {
                warn!("No cache directory available, running without disk cache");
                None
            }
        };

        Self {
            config,
            disk_cache,
            tables,
            offline: false,
        }
    }

    /// Serve sheets from caches only
    pub fn with_offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    pub fn is_offline(&self) -> bool {
        self.offline
    }

    pub fn disk_cache(&self) -> Option<&CsvCache> {
        self.disk_cache.as_ref()
    }

    /// Load a product's table, discarding warnings
    pub async fn load(&self, product: Product) -> Result<Arc<PriceTable>, PriceError> {
        let mut report = LoadReport::new();
        self.load_checked(product, false, &mut report).await
    }

    /// Load a product's table, recording cache problems and data-quality
    /// warnings in `report`
    ///
    /// `refresh` bypasses both caches and re-fetches the source.
    pub async fn load_checked(
        &self,
        product: Product,
        refresh: bool,
        report: &mut LoadReport,
    ) -> Result<Arc<PriceTable>, PriceError> {
        self.load_entry(product, refresh, report)
            .await
            .map(|(table, _)| table)
    }

    async fn load_entry(
        &self,
        product: Product,
        refresh: bool,
        report: &mut LoadReport,
    ) -> Result<(Arc<PriceTable>, Arc<CachedTable>), PriceError> {
        let cached = self.sheet(product, refresh, report).await?;
        let table = build_table(product, &cached.raw, report)?;
        debug!(
            product = product.key(),
            rows = table.len(),
            fetched_at = %cached.fetched_at,
            source = %cached.source,
            "Price table ready"
        );
        Ok((Arc::new(table), cached))
    }

    /// Load every product; one failing sheet does not stop the others
    pub async fn load_all(&self, refresh: bool) -> (PriceBook, LoadReport) {
        let mut report = LoadReport::new();
        let mut book = PriceBook::default();

        info!(base_url = %self.config.base_url, offline = self.offline, "Loading price sheets");

        for product in Product::ALL {
            match self.load_entry(product, refresh, &mut report).await {
                Ok((table, cached)) => {
                    book.insert(product, table, cached.info());
                    report.products_loaded += 1;
                }
                Err(e) => {
                    warn!(product = product.key(), error = %e, "Failed to load price sheet");
                    report.add_error(LoadError::from_price_error(product.key(), &e));
                    report.products_failed += 1;
                }
            }
        }

        if book.is_empty() {
            report.add_fatal(
                "all",
                format!("No price sheet could be loaded from {}", self.config.base_url),
            );
        }

        info!(
            products_loaded = report.products_loaded,
            products_failed = report.products_failed,
            errors = report.errors.len(),
            "Price sheets loaded"
        );

        (book, report)
    }

    /// Drop one sheet from the in-memory cache
    pub async fn invalidate(&self, url: &str) {
        self.tables.invalidate(url).await;
        debug!(url, "Sheet removed from memory cache");
    }

    /// Drop every sheet from the in-memory cache
    pub fn invalidate_all(&self) {
        self.tables.invalidate_all();
        debug!("Memory sheet cache cleared");
    }

    /// Remove on-disk copies, returning how many were removed
    pub fn clear_disk_cache(&self) -> anyhow::Result<usize> {
        match &self.disk_cache {
            Some(cache) => cache.clear(),
            None => Ok(0),
        }
    }

    async fn sheet(
        &self,
        product: Product,
        refresh: bool,
        report: &mut LoadReport,
    ) -> Result<Arc<CachedTable>, PriceError> {
        let url = self.config.url_for(product);

        if !refresh {
            if let Some(cached) = self.tables.get(&url).await {
                if cached.is_fresh(self.config.cache_ttl()) {
                    debug!(url = %url, "Sheet served from memory cache");
                    return Ok(cached);
                }
                debug!(url = %url, fetched_at = %cached.fetched_at, "Memory copy expired");
                self.tables.invalidate(&url).await;
            }
        }

        let (body, fetched_at) = if self.offline {
            self.offline_body(product, &url, report)?
        } else {
            match self.disk_body(product, &url, refresh, report) {
                Some(hit) => hit,
                None => {
                    let body = fetch_csv(&url, self.config.request_timeout()).await?;
                    self.save_to_disk(product, &url, &body, report);
                    (body, Utc::now())
                }
            }
        };

        let raw = RawTable::from_csv_str(product.key(), &body)?;
        let cached = Arc::new(CachedTable {
            raw: Arc::new(raw),
            fetched_at,
            source: url.clone(),
        });
        self.tables.insert(url, Arc::clone(&cached)).await;
        Ok(cached)
    }

    fn disk_body(
        &self,
        product: Product,
        url: &str,
        refresh: bool,
        report: &mut LoadReport,
    ) -> Option<(String, DateTime<Utc>)> {
        if refresh {
            return None;
        }
        let cache = self.disk_cache.as_ref()?;
        match cache.load(product, url) {
            Ok(hit) => hit.map(|sheet| (sheet.body, sheet.last_updated)),
            Err(e) => {
                report.add_warning(product.key(), format!("Ignoring unreadable cache entry: {:#}", e));
                None
            }
        }
    }

    fn offline_body(
        &self,
        product: Product,
        url: &str,
        report: &mut LoadReport,
    ) -> Result<(String, DateTime<Utc>), PriceError> {
        let unavailable = |message: &str| PriceError::Fetch {
            url: url.to_string(),
            message: message.to_string(),
        };

        let cache = self
            .disk_cache
            .as_ref()
            .ok_or_else(|| unavailable("offline mode and no cache directory"))?;

        let sheet = match cache.load_any(product) {
            Ok(Some(sheet)) => sheet,
            Ok(None) => return Err(unavailable("offline mode and no cached copy")),
            Err(e) => return Err(unavailable(&format!("offline mode and cached copy unreadable: {:#}", e))),
        };

        if sheet.source != url {
            report.add_warning(
                product.key(),
                format!("Offline: using cached copy of {} instead of {}", sheet.source, url),
            );
        }
        Ok((sheet.body, sheet.last_updated))
    }

    fn save_to_disk(&self, product: Product, url: &str, body: &str, report: &mut LoadReport) {
        if let Some(cache) = &self.disk_cache {
            if let Err(e) = cache.save(product, url, body) {
                report.add_warning(product.key(), format!("Could not cache sheet: {:#}", e));
            }
        }
    }
}

/// Turn a parsed sheet into the product's typed table
///
/// Moments is normalized from the wide layout, Answers is read in canonical
/// layout and Conversations as agent brackets, whose partition is validated.
pub fn build_table(
    product: Product,
    raw: &RawTable,
    report: &mut LoadReport,
) -> Result<PriceTable, PriceError> {
    match product.shape() {
        TableShape::ThresholdKeyed => {
            let table = if product.is_wide() {
                normalize(raw)?
            } else {
                ThresholdTable::from_raw(raw)?
            };
            table.check(product.key(), report);
            Ok(PriceTable::ThresholdKeyed(table))
        }
        TableShape::BracketKeyed => {
            let table = BracketTable::from_raw(raw)?;
            table.validate_partition()?;
            table.check(product.key(), report);
            Ok(PriceTable::BracketKeyed(table))
        }
    }
}

/// Loaded tables of every product that loaded successfully
#[derive(Debug, Clone, Default)]
pub struct PriceBook {
    tables: HashMap<Product, Arc<PriceTable>>,
    sheets: HashMap<Product, SheetInfo>,
}

impl PriceBook {
    pub fn insert(&mut self, product: Product, table: Arc<PriceTable>, info: SheetInfo) {
        self.tables.insert(product, table);
        self.sheets.insert(product, info);
    }

    pub fn get(&self, product: Product) -> Option<&Arc<PriceTable>> {
        self.tables.get(&product)
    }

    /// Fetch time and source of a loaded product's sheet
    pub fn sheet_info(&self, product: Product) -> Option<&SheetInfo> {
        self.sheets.get(&product)
    }

    /// Loaded products in `Product::ALL` order
    pub fn products(&self) -> Vec<Product> {
        Product::ALL
            .into_iter()
            .filter(|p| self.tables.contains_key(p))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn quote(
        &self,
        product: Product,
        plan: &str,
        key: &UsageKey,
    ) -> Result<PriceQuote, PriceError> {
        let table = self.get(product).ok_or_else(|| {
            PriceError::invalid_input(format!("{} prices are not loaded", product))
        })?;
        calculator::quote(table, plan, key)
    }
}
