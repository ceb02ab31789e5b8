//! Output formatting utilities

use crate::engine::{ReconciliationResult, ReconciliationSummary};
use crate::error::Result;
use crate::job::{JobFailure, JobId, JobRecord, JobState, JobStatus};
use crate::report::{RenderedReport, ReportFormat};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

/// Pretty printer for reconcyl output
pub struct PrettyPrinter;

impl PrettyPrinter {
    /// Print section counts of a result
    pub fn print_summary(result: &ReconciliationResult) {
        let summary = result.summary();
        println!("📊 Reconciliation Summary");
        println!("├─ Columns compared: {}", result.columns.join(", "));
        println!("├─ Missing in target: {}", summary.source_only);
        println!("├─ Missing in source: {}", summary.target_only);
        println!("└─ Matched: {}", summary.matched);
    }

    /// Print where a report was written
    pub fn print_report_written(report: &RenderedReport, path: &Path) {
        println!(
            "📄 Wrote {} report ({}) to {}",
            report.format,
            format_bytes(report.content.len() as u64),
            path.display()
        );
    }

    /// Print one job's status
    pub fn print_job_status(id: &JobId, status: &JobStatus) {
        println!("🧾 Job: {}", id);
        match status {
            JobStatus::Pending => println!("└─ ⏳ State: pending"),
            JobStatus::Running => println!("└─ ⚙️ State: running"),
            JobStatus::Succeeded { result } => {
                let summary = result.summary();
                println!("├─ ✅ State: succeeded");
                println!("├─ Missing in target: {}", summary.source_only);
                println!("├─ Missing in source: {}", summary.target_only);
                println!("└─ Matched: {}", summary.matched);
            }
            JobStatus::Failed { failure } => {
                println!("├─ ❌ State: failed");
                println!("├─ Kind: {}", failure.kind);
                println!("└─ Reason: {}", failure.message);
            }
        }
    }

    /// Print the job list
    pub fn print_job_list(records: &[JobRecord]) {
        if records.is_empty() {
            println!("No jobs found.");
            return;
        }

        println!("🧾 Jobs:");
        for (i, record) in records.iter().enumerate() {
            let prefix = if i == records.len() - 1 { "└─" } else { "├─" };
            println!(
                "{} {} {} [{}] submitted {}",
                prefix,
                state_marker(record.state),
                record.id,
                record.format,
                record.submitted_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
        }
    }
}

fn state_marker(state: JobState) -> &'static str {
    match state {
        JobState::Pending => "⏳",
        JobState::Running => "⚙️",
        JobState::Succeeded => "✅",
        JobState::Failed => "❌",
    }
}

/// Compact, result-free view of a job for listings
#[derive(Debug, Serialize)]
pub struct JobSummary {
    pub id: JobId,
    pub state: JobState,
    pub format: ReportFormat,
    pub submitted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counts: Option<ReconciliationSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<JobFailure>,
}

impl From<&JobRecord> for JobSummary {
    fn from(record: &JobRecord) -> Self {
        Self {
            id: record.id,
            state: record.state,
            format: record.format,
            submitted_at: record.submitted_at,
            finished_at: record.finished_at,
            counts: record.result.as_ref().map(ReconciliationResult::summary),
            failure: record.failure.clone(),
        }
    }
}

/// JSON formatter for machine-readable output
pub struct JsonFormatter;

impl JsonFormatter {
    /// Format any serializable data as JSON
    pub fn format<T: serde::Serialize + ?Sized>(data: &T) -> Result<String> {
        Ok(serde_json::to_string_pretty(data)?)
    }

    /// Format a job status with its id
    pub fn format_job_status(id: &JobId, status: &JobStatus) -> Result<String> {
        let mut json = serde_json::to_value(status)?;
        if let Some(object) = json.as_object_mut() {
            object.insert("id".to_string(), serde_json::Value::String(id.to_string()));
        }
        Ok(serde_json::to_string_pretty(&json)?)
    }

    pub fn format_job_list(records: &[JobRecord]) -> Result<String> {
        let summaries: Vec<JobSummary> = records.iter().map(JobSummary::from).collect();
        Self::format(&summaries)
    }
}

/// Format bytes in human-readable format
fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}
