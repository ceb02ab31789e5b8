//! Set-based reconciliation of two tables

use crate::error::{ReconError, Result};
use crate::fingerprint::{fingerprint_records, Fingerprint};
use crate::record::{Record, Table};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// How to handle source and target tables whose columns differ
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnPolicy {
    /// Column sets must be identical (order may differ)
    #[default]
    Strict,
    /// Compare on the columns both tables share
    Common,
}

/// Comparison settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    pub column_policy: ColumnPolicy,
    /// Leave records with null values out of the source-only and target-only sets.
    /// Never affects the matched set.
    pub drop_incomplete: bool,
}

/// Outcome of a reconciliation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationResult {
    pub columns: Vec<String>,
    pub source_only: Vec<Record>,
    pub target_only: Vec<Record>,
    pub matched: Vec<Record>,
}

/// Record counts per section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationSummary {
    pub source_only: usize,
    pub target_only: usize,
    pub matched: usize,
}

impl ReconciliationResult {
    pub fn summary(&self) -> ReconciliationSummary {
        ReconciliationSummary {
            source_only: self.source_only.len(),
            target_only: self.target_only.len(),
            matched: self.matched.len(),
        }
    }

    /// True when both tables hold exactly the same record values
    pub fn is_reconciled(&self) -> bool {
        self.source_only.is_empty() && self.target_only.is_empty()
    }
}

/// Computes the source-only / target-only / matched partition
#[derive(Debug, Clone, Default)]
pub struct ReconciliationEngine {
    options: EngineOptions,
}

impl ReconciliationEngine {
    pub fn new(options: EngineOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Reconcile `source` against `target`.
    ///
    /// Records are compared as whole tuples over the compared columns; no key
    /// is assumed. Each output section is deduplicated and follows the row
    /// order of the table it came from.
    pub fn reconcile(&self, source: &Table, target: &Table) -> Result<ReconciliationResult> {
        let columns = self.compared_columns(source, target)?;

        let source_records = project_all(source, &columns);
        let target_records = project_all(target, &columns);

        let source_prints = fingerprint_records(&source_records);
        let target_prints = fingerprint_records(&target_records);

        let source_set: HashSet<&Fingerprint> = source_prints.iter().collect();
        let target_set: HashSet<&Fingerprint> = target_prints.iter().collect();

        let mut source_only = Vec::new();
        let mut matched = Vec::new();
        let mut seen = HashSet::new();
        for (record, print) in source_records.iter().zip(&source_prints) {
            if !seen.insert(print) {
                continue;
            }
            if target_set.contains(print) {
                matched.push(record.clone());
            } else if self.keeps_unmatched(record) {
                source_only.push(record.clone());
            }
        }

        let mut target_only = Vec::new();
        let mut seen = HashSet::new();
        for (record, print) in target_records.iter().zip(&target_prints) {
            if !seen.insert(print) {
                continue;
            }
            if !source_set.contains(print) && self.keeps_unmatched(record) {
                target_only.push(record.clone());
            }
        }

        log::debug!(
            "Reconciled {} source rows against {} target rows: {} source-only, {} target-only, {} matched",
            source.len(),
            target.len(),
            source_only.len(),
            target_only.len(),
            matched.len()
        );

        Ok(ReconciliationResult {
            columns,
            source_only,
            target_only,
            matched,
        })
    }

    fn keeps_unmatched(&self, record: &Record) -> bool {
        !self.options.drop_incomplete || record.is_complete()
    }

    /// Resolve the columns to compare on, in source column order
    fn compared_columns(&self, source: &Table, target: &Table) -> Result<Vec<String>> {
        let target_columns: HashSet<&String> = target.columns().iter().collect();
        let source_columns: HashSet<&String> = source.columns().iter().collect();

        let source_extra: Vec<String> = source
            .columns()
            .iter()
            .filter(|c| !target_columns.contains(c))
            .cloned()
            .collect();
        let target_extra: Vec<String> = target
            .columns()
            .iter()
            .filter(|c| !source_columns.contains(c))
            .cloned()
            .collect();

        let common: Vec<String> = source
            .columns()
            .iter()
            .filter(|c| target_columns.contains(c))
            .cloned()
            .collect();

        let mismatch = || ReconError::SchemaMismatch {
            source_only: source_extra.clone(),
            target_only: target_extra.clone(),
        };

        if source_extra.is_empty() && target_extra.is_empty() {
            return Ok(common);
        }

        match self.options.column_policy {
            ColumnPolicy::Strict => Err(mismatch()),
            ColumnPolicy::Common if common.is_empty() => Err(mismatch()),
            ColumnPolicy::Common => {
                log::warn!(
                    "Comparing on {} common columns; ignoring source columns [{}] and target columns [{}]",
                    common.len(),
                    source_extra.join(", "),
                    target_extra.join(", ")
                );
                Ok(common)
            }
        }
    }
}

fn project_all(table: &Table, columns: &[String]) -> Vec<Record> {
    if table.columns() == columns {
        return table.records().to_vec();
    }
    table.records().iter().map(|r| r.project(columns)).collect()
}
