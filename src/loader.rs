//! Delimited text loading and normalization

use crate::error::{ReconError, Result};
use crate::record::{Scalar, Table};
use serde::{Deserialize, Serialize};

/// Cell contents treated as missing values
pub const DEFAULT_NULL_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Options controlling how raw text becomes a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderOptions {
    pub delimiter: char,
    pub null_markers: Vec<String>,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            null_markers: DEFAULT_NULL_MARKERS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl LoaderOptions {
    pub fn validate(&self) -> Result<()> {
        if !self.delimiter.is_ascii() {
            return Err(ReconError::config(format!(
                "delimiter must be a single ASCII character, got '{}'",
                self.delimiter
            )));
        }
        Ok(())
    }
}

/// Parses delimited text into typed, normalized tables
#[derive(Debug, Clone, Default)]
pub struct TableLoader {
    options: LoaderOptions,
}

impl TableLoader {
    pub fn new(options: LoaderOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { options })
    }

    pub fn options(&self) -> &LoaderOptions {
        &self.options
    }

    /// Load raw delimited text. The first non-empty line is the header row.
    pub fn load(&self, raw: &str) -> Result<Table> {
        if raw.trim().is_empty() {
            return Err(ReconError::parse("input has no header row"));
        }

        // Field counts are checked below so blank lines can be skipped first
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.options.delimiter as u8)
            .has_headers(true)
            .flexible(true)
            .from_reader(raw.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| ReconError::parse(format!("unreadable header row: {}", e)))?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for result in reader.records() {
            let record =
                result.map_err(|e| ReconError::parse(format!("malformed delimited text: {}", e)))?;

            if record.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }

            if record.len() != headers.len() {
                let line = record.position().map(|p| p.line()).unwrap_or(0);
                return Err(ReconError::parse(format!(
                    "line {} has {} fields, expected {}",
                    line,
                    record.len(),
                    headers.len()
                )));
            }

            rows.push(record.iter().map(|cell| self.parse_cell(cell)).collect());
        }

        let table = Table::new(headers, rows)?;
        log::debug!(
            "Loaded table with {} columns and {} rows",
            table.columns().len(),
            table.len()
        );
        Ok(table)
    }

    /// Trim a cell and give it a type: null marker, integer, finite float, or text
    fn parse_cell(&self, cell: &str) -> Scalar {
        let trimmed = cell.trim();

        if self.options.null_markers.iter().any(|m| m == trimmed) {
            return Scalar::Null;
        }

        if let Ok(i) = trimmed.parse::<i64>() {
            return Scalar::Integer(i);
        }

        match trimmed.parse::<f64>() {
            Ok(f) if f.is_finite() => Scalar::Float(f),
            _ => Scalar::Text(trimmed.to_string()),
        }
    }
}
