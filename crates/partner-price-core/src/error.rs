//! Error types for partner-price-core
//!
//! Structural problems (missing columns, broken bracket partitions) are fatal
//! for the table they occur in. A selection that matches no row is recoverable:
//! callers re-prompt instead of aborting.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for price sheet operations
#[derive(Error, Debug)]
pub enum PriceError {
    // ===================
    // Schema Errors
    // ===================
    #[error("Missing required column '{column}' in {table}")]
    Schema { table: String, column: String },

    #[error("Invalid agent brackets for plan '{plan}': {message}")]
    InvalidBrackets { plan: String, message: String },

    // ===================
    // Lookup Errors
    // ===================
    #[error("No price found for plan '{plan}' at {key}")]
    NotFound { plan: String, key: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    // ===================
    // Parse Errors
    // ===================
    #[error("Malformed CSV at line {line}: {message}")]
    CsvParse { line: usize, message: String },

    // ===================
    // Source Errors
    // ===================
    #[error("Failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("Failed to read file: {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ===================
    // Config Errors
    // ===================
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl PriceError {
    pub fn schema(table: impl Into<String>, column: impl Into<String>) -> Self {
        PriceError::Schema {
            table: table.into(),
            column: column.into(),
        }
    }

    pub fn not_found(plan: impl Into<String>, key: impl Into<String>) -> Self {
        PriceError::NotFound {
            plan: plan.into(),
            key: key.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        PriceError::InvalidInput {
            message: message.into(),
        }
    }

    /// True when the caller should re-prompt for a selection rather than abort
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PriceError::NotFound { .. })
    }
}

/// Severity level for errors during load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Data-quality issue, the table is still usable
    Warning,
    /// One product failed to load, the others are usable
    Error,
    /// Nothing can be computed
    Fatal,
}

/// Individual entry in a load report
#[derive(Debug, Clone)]
pub struct LoadError {
    pub source: String,
    pub message: String,
    pub severity: ErrorSeverity,
    /// Actionable suggestion for user (optional)
    pub suggestion: Option<String>,
}

impl LoadError {
    pub fn warning(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
            severity: ErrorSeverity::Warning,
            suggestion: None,
        }
    }

    pub fn error(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
            severity: ErrorSeverity::Error,
            suggestion: None,
        }
    }

    pub fn fatal(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
            severity: ErrorSeverity::Fatal,
            suggestion: None,
        }
    }

    /// Add an actionable suggestion to this error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Create user-friendly error from PriceError with context-aware suggestions
    pub fn from_price_error(source: impl Into<String>, error: &PriceError) -> Self {
        let suggestion = match error {
            PriceError::Schema { column, .. } => Some(format!(
                "Check the CSV header row contains a '{}' column",
                column
            )),
            PriceError::InvalidBrackets { plan, .. } => Some(format!(
                "Fix agent_min/agent_max rows of plan '{}' so they cover 1.. without gaps",
                plan
            )),
            PriceError::Fetch { url, .. } => Some(format!(
                "Check the file is publicly readable: curl -I {}",
                url
            )),
            PriceError::CsvParse { line, .. } => {
                Some(format!("Inspect the source around line {}", line))
            }
            _ => None,
        };

        Self {
            source: source.into(),
            message: error.to_string(),
            severity: ErrorSeverity::Error,
            suggestion,
        }
    }
}

/// Report of problems encountered while loading price sheets
///
/// One broken sheet does not prevent the others from being quoted.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub errors: Vec<LoadError>,
    pub products_loaded: usize,
    pub products_failed: usize,
}

impl LoadReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, error: LoadError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, source: impl Into<String>, message: impl Into<String>) {
        self.errors.push(LoadError::warning(source, message));
    }

    pub fn add_fatal(&mut self, source: impl Into<String>, message: impl Into<String>) {
        self.errors.push(LoadError::fatal(source, message));
    }

    /// Returns true if there are any fatal errors
    pub fn has_fatal_errors(&self) -> bool {
        self.errors
            .iter()
            .any(|e| e.severity == ErrorSeverity::Fatal)
    }

    /// Returns true if there are any errors (including warnings)
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns only warnings
    pub fn warnings(&self) -> impl Iterator<Item = &LoadError> {
        self.errors
            .iter()
            .filter(|e| e.severity == ErrorSeverity::Warning)
    }

    /// Returns count by severity
    pub fn error_count(&self) -> (usize, usize, usize) {
        let count = |severity: ErrorSeverity| {
            self.errors
                .iter()
                .filter(|e| e.severity == severity)
                .count()
        };
        (
            count(ErrorSeverity::Warning),
            count(ErrorSeverity::Error),
            count(ErrorSeverity::Fatal),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_report_severity_counting() {
        let mut report = LoadReport::new();
        report.add_warning("moments", "duplicate threshold");
        report.add_error(LoadError::error("answers", "fetch failed"));
        report.add_fatal("all", "no price sheet loaded");

        let (warnings, errors, fatal) = report.error_count();
        assert_eq!(warnings, 1);
        assert_eq!(errors, 1);
        assert_eq!(fatal, 1);
        assert!(report.has_fatal_errors());
        assert_eq!(report.warnings().count(), 1);
    }

    #[test]
    fn test_only_not_found_is_recoverable() {
        assert!(PriceError::not_found("Grow", "threshold 1000").is_recoverable());
        assert!(!PriceError::schema("moments", "threshold_grow").is_recoverable());
        assert!(!PriceError::invalid_input("agent count must be positive").is_recoverable());
    }

    #[test]
    fn test_suggestion_for_schema_error() {
        let err = PriceError::schema("moments", "price_eur_scale");
        let entry = LoadError::from_price_error("moments", &err);
        assert_eq!(entry.severity, ErrorSeverity::Error);
        assert!(entry.message.contains("price_eur_scale"));
        assert!(entry.suggestion.unwrap().contains("price_eur_scale"));
    }
}
