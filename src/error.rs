//! Error types for reconcyl operations

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReconError>;

#[derive(Error, Debug)]
pub enum ReconError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("Parse error: {message}")]
    Parse { message: String },

    #[error("Schema error: {message}")]
    Schema { message: String },

    #[error(
        "Schema mismatch: columns only in source [{}], columns only in target [{}]",
        .source_only.join(", "),
        .target_only.join(", ")
    )]
    SchemaMismatch {
        source_only: Vec<String>,
        target_only: Vec<String>,
    },

    #[error("Unsupported report format: {format}. Use 'json', 'csv' or 'html'")]
    UnsupportedFormat { format: String },

    #[error("Job not found: {id}")]
    NotFound { id: String },

    #[error("Job {id} has no report yet (state: {state})")]
    NotReady { id: String, state: String },

    #[error("Notification error: {message}")]
    Notification { message: String },

    #[error("Job exceeded its time limit of {limit_ms} ms")]
    Timeout { limit_ms: u64 },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ReconError {
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema {
            message: msg.into(),
        }
    }

    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    pub fn not_found(id: impl ToString) -> Self {
        Self::NotFound { id: id.to_string() }
    }

    pub fn notification(msg: impl Into<String>) -> Self {
        Self::Notification {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: msg.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
        }
    }

    /// Classification recorded on a failed job
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Parse { .. } | Self::Csv(_) => FailureKind::Parse,
            Self::Schema { .. } => FailureKind::Schema,
            Self::SchemaMismatch { .. } => FailureKind::SchemaMismatch,
            Self::UnsupportedFormat { .. } => FailureKind::UnsupportedFormat,
            Self::Timeout { .. } => FailureKind::Timeout,
            _ => FailureKind::Internal,
        }
    }
}

/// Coarse error category stored with a failed job.
///
/// Lets a poller tell malformed input apart from an internal fault without
/// parsing the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Parse,
    Schema,
    SchemaMismatch,
    UnsupportedFormat,
    Timeout,
    Internal,
}

impl FailureKind {
    /// True when the failure was caused by the submitted data rather than the service
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::Parse | Self::Schema | Self::SchemaMismatch | Self::UnsupportedFormat
        )
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Parse => "parse",
            Self::Schema => "schema",
            Self::SchemaMismatch => "schema_mismatch",
            Self::UnsupportedFormat => "unsupported_format",
            Self::Timeout => "timeout",
            Self::Internal => "internal",
        };
        f.write_str(name)
    }
}
