//! Parsers for published price sheets

pub mod csv;

pub use csv::{parse_numeric, RawTable};
