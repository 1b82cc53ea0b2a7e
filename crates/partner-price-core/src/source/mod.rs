//! Price sheet sources
//!
//! Sheets are published as CSV files, usually in a public S3 bucket. They are
//! fetched over HTTP (or read from disk for mirrors and tests) and kept in an
//! on-disk cache with a TTL.

pub mod cache;
pub mod fetch;

pub use cache::{CachedSheet, CsvCache};
pub use fetch::{fetch_csv, SourceLocation};
