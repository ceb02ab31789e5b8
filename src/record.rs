//! Typed records and tables

use crate::error::{ReconError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A single cell value.
///
/// Integers and floats compare numerically, so `Integer(1) == Float(1.0)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Integral value of a number, if it has one that fits in an i64
    pub fn as_integral(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Some(*f as i64),
            _ => None,
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Integer(_), Self::Float(_)) | (Self::Float(_), Self::Integer(_)) => {
                match (self.as_integral(), other.as_integral()) {
                    (Some(a), Some(b)) => a == b,
                    _ => false,
                }
            }
            _ => false,
        }
    }
}

// Loaded floats are always finite, so equality is reflexive.
impl Eq for Scalar {}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(x) if x.fract() == 0.0 && x.abs() < 1e16 => write!(f, "{:.1}", x),
            Self::Float(x) => write!(f, "{}", x),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// One row of normalized field to value data, in column order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(IndexMap<String, Scalar>);

impl Record {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    pub fn insert(&mut self, column: impl Into<String>, value: Scalar) {
        self.0.insert(column.into(), value);
    }

    pub fn get(&self, column: &str) -> Option<&Scalar> {
        self.0.get(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &Scalar> {
        self.0.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A record is complete when none of its values is null
    pub fn is_complete(&self) -> bool {
        !self.0.values().any(Scalar::is_null)
    }

    /// Restrict the record to `columns`, in that order. Missing columns become null.
    pub fn project(&self, columns: &[String]) -> Record {
        let mut projected = IndexMap::with_capacity(columns.len());
        for column in columns {
            let value = self.0.get(column).cloned().unwrap_or(Scalar::Null);
            projected.insert(column.clone(), value);
        }
        Record(projected)
    }
}

impl<K: Into<String>> FromIterator<(K, Scalar)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, Scalar)>>(iter: I) -> Self {
        Record(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Normalize a column name: trimmed and lower-cased
pub fn normalize_column(name: &str) -> String {
    name.trim().to_lowercase()
}

/// An ordered, immutable collection of records sharing one schema
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    records: Vec<Record>,
}

impl Table {
    /// Build a table from raw column names and positional rows.
    ///
    /// Column names are normalized; duplicates after normalization are a
    /// schema error and blank names or ragged rows are a parse error.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Scalar>>) -> Result<Self> {
        let columns: Vec<String> = columns.iter().map(|c| normalize_column(c)).collect();

        if columns.is_empty() {
            return Err(ReconError::parse("input has no header row"));
        }

        if let Some(pos) = columns.iter().position(|c| c.is_empty()) {
            return Err(ReconError::parse(format!(
                "header column {} has a blank name",
                pos + 1
            )));
        }

        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(ReconError::schema(format!(
                    "duplicate column '{}' after normalization",
                    column
                )));
            }
        }

        let mut records = Vec::with_capacity(rows.len());
        for (index, row) in rows.into_iter().enumerate() {
            if row.len() != columns.len() {
                return Err(ReconError::parse(format!(
                    "row {} has {} fields, expected {}",
                    index + 1,
                    row.len(),
                    columns.len()
                )));
            }
            records.push(columns.iter().cloned().zip(row).collect());
        }

        Ok(Self { columns, records })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
