//! Data models for partner-price

pub mod currency;
pub mod price_table;
pub mod product;
pub mod quote;

pub use currency::Currency;
pub use price_table::{BracketRow, BracketTable, PriceTable, ThresholdRow, ThresholdTable, TierRate};
pub use product::{Product, TableShape, TierPlan, CATCH_ALL_PLAN};
pub use quote::{CurrencyQuote, Overage, PriceQuote, QuoteKey};
