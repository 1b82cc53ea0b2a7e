//! partner-price-core - Core library for partner-price
//!
//! Provides the CSV reader, wide-sheet normalizer, tiered price calculator,
//! source configuration and the cached price store.

pub mod calculator;
pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod normalize;
pub mod parsers;
pub mod source;
pub mod store;

pub use calculator::{quote, UsageKey};
pub use config::SourceConfig;
pub use error::{ErrorSeverity, LoadError, LoadReport, PriceError};
pub use export::{export_price_table_to_csv, export_price_table_to_json};
pub use normalize::normalize;
pub use store::{build_table, PriceBook, PriceStore, SheetInfo};
