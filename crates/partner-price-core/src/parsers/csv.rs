//! CSV reader for published price sheets
//!
//! Sheets are small (tens of rows), so the whole body is parsed into memory.
//! Supports double-quoted fields with `""` escapes, embedded commas and
//! newlines, CRLF line endings and a leading UTF-8 BOM.

use crate::error::PriceError;
use tracing::{debug, warn};

/// A parsed sheet: header names plus rows of raw string cells
///
/// Every row holds exactly `headers.len()` cells.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    name: String,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Build a table from already split cells, padding or truncating rows to the header width
    pub fn new(name: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let name = name.into();
        let headers: Vec<String> = headers.into_iter().map(|h| h.trim().to_string()).collect();
        let width = headers.len();

        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(idx, mut row)| {
                if row.len() > width {
                    warn!(
                        table = %name,
                        row = idx + 1,
                        cells = row.len(),
                        width,
                        "Row wider than header, extra cells dropped"
                    );
                }
                row.resize(width, String::new());
                row
            })
            .collect();

        Self {
            name,
            headers,
            rows,
        }
    }

    /// Parse CSV text whose first record is the header row
    pub fn from_csv_str(name: impl Into<String>, text: &str) -> Result<Self, PriceError> {
        let name = name.into();
        let mut records = parse_records(text)?.into_iter();

        let headers = records.next().ok_or_else(|| PriceError::CsvParse {
            line: 1,
            message: format!("{} has no header row", name),
        })?;

        let table = Self::new(name, headers, records.collect());
        debug!(
            table = %table.name,
            columns = table.headers.len(),
            rows = table.rows.len(),
            "Parsed CSV sheet"
        );
        Ok(table)
    }

    /// Label used in error messages
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column, matched trimmed and ASCII case-insensitively
    pub fn find_column(&self, column: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(column))
    }

    /// Position of a required column, `SchemaError` if absent
    pub fn column(&self, column: &str) -> Result<usize, PriceError> {
        self.find_column(column)
            .ok_or_else(|| PriceError::schema(&self.name, column))
    }

    /// Cell content (untrimmed); empty string for out-of-range positions
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Serialize back to CSV, quoting cells where needed
    pub fn to_csv_string(&self) -> String {
        let mut out = String::new();
        write_record(&mut out, &self.headers);
        for row in &self.rows {
            write_record(&mut out, row);
        }
        out
    }
}

/// Coerce a cell to a number
///
/// Blank, non-numeric, `NaN` and infinite values become `None`; nothing is
/// ever defaulted to zero.
pub fn parse_numeric(cell: &str) -> Option<f64> {
    cell.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

fn write_record(out: &mut String, cells: &[String]) {
    let line = cells
        .iter()
        .map(|cell| {
            if cell.contains([',', '"', '\n', '\r']) {
                format!("\"{}\"", cell.replace('"', "\"\""))
            } else {
                cell.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(",");
    out.push_str(&line);
    out.push('\n');
}

fn finish_record(records: &mut Vec<Vec<String>>, record: Vec<String>) {
    // Blank line
    if record.len() == 1 && record[0].trim().is_empty() {
        return;
    }
    records.push(record);
}

fn parse_records(text: &str) -> Result<Vec<Vec<String>>, PriceError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut quote_line = 1;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() => {
                in_quotes = true;
                quote_line = line;
            }
            ',' => record.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\r' | '\n' => {
                record.push(std::mem::take(&mut field));
                finish_record(&mut records, std::mem::take(&mut record));
                line += 1;
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(PriceError::CsvParse {
            line: quote_line,
            message: "unterminated quoted field".to_string(),
        });
    }

    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        finish_record(&mut records, record);
    }

    Ok(records)
}
