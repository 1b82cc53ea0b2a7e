//! Source configuration
//!
//! Read from `<config_dir>/partner-price/config.toml` when present. Every field
//! is optional in the file; missing ones fall back to the published S3 bucket.
//!
//! ```toml
//! base_url = "https://infobip-partner-price.s3.ap-northeast-2.amazonaws.com"
//! cache_ttl_hours = 24
//!
//! [files]
//! moments = "moments_price.csv"
//! ```

use crate::error::PriceError;
use crate::models::Product;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Public bucket the price sheets are published to
pub const DEFAULT_BASE_URL: &str = "https://infobip-partner-price.s3.ap-northeast-2.amazonaws.com";

/// Longest accepted cache TTL (100 years); moka rejects TTLs beyond 1000 years
pub const MAX_CACHE_TTL_HOURS: u64 = 24 * 365 * 100;

/// Per-product sheet locations, relative to `base_url` unless absolute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceFiles {
    pub moments: String,
    pub conversations: String,
    pub answers: String,
}

impl Default for SourceFiles {
    fn default() -> Self {
        Self {
            moments: Product::Moments.default_file_name().to_string(),
            conversations: Product::Conversations.default_file_name().to_string(),
            answers: Product::Answers.default_file_name().to_string(),
        }
    }
}

/// Where price sheets come from and how long copies stay fresh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// HTTP(S) URL, `file://` URL or local directory
    pub base_url: String,

    /// Age after which cached sheets are fetched again
    pub cache_ttl_hours: u64,

    /// HTTP request timeout
    pub request_timeout_secs: u64,

    /// Override for the on-disk sheet cache (default: `<cache_dir>/partner-price`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    pub files: SourceFiles,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_ttl_hours: 24,
            request_timeout_secs: 30,
            cache_dir: None,
            files: SourceFiles::default(),
        }
    }
}

impl SourceConfig {
    /// `<config_dir>/partner-price/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("partner-price").join("config.toml"))
    }

    /// Load configuration
    ///
    /// An explicit path must exist. Without one, the default path is used if
    /// present and built-in defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => path,
                None => {
                    tracing::debug!("No config file, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        tracing::info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, PriceError> {
        let config: Self = toml::from_str(content).map_err(|e| PriceError::InvalidConfig {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    pub fn validate(&self) -> Result<(), PriceError> {
        if self.base_url.trim().is_empty() {
            return Err(PriceError::InvalidConfig {
                message: "base_url must not be empty".to_string(),
            });
        }
        if self.cache_ttl_hours > MAX_CACHE_TTL_HOURS {
            return Err(PriceError::InvalidConfig {
                message: format!(
                    "cache_ttl_hours must be at most {} (got {})",
                    MAX_CACHE_TTL_HOURS, self.cache_ttl_hours
                ),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(PriceError::InvalidConfig {
                message: "request_timeout_secs must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    pub fn file_name(&self, product: Product) -> &str {
        match product {
            Product::Moments => &self.files.moments,
            Product::Conversations => &self.files.conversations,
            Product::Answers => &self.files.answers,
        }
    }

    /// Full location of a product's sheet
    ///
    /// A file entry that is itself a URL or an absolute path is used as is.
    pub fn url_for(&self, product: Product) -> String {
        let file = self.file_name(product);
        if file.contains("://") || Path::new(file).is_absolute() {
            return file.to_string();
        }
        format!("{}/{}", self.base_url.trim_end_matches('/'), file.trim_start_matches('/'))
    }

    /// Cache TTL, clamped to `MAX_CACHE_TTL_HOURS` for configs built without `validate`
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_hours.min(MAX_CACHE_TTL_HOURS) * 3600)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Directory of the on-disk sheet cache
    pub fn cache_dir(&self) -> Option<PathBuf> {
        self.cache_dir
            .clone()
            .or_else(|| dirs::cache_dir().map(|dir| dir.join("partner-price")))
    }
}
