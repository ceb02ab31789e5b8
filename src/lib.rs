//! # reconcyl
//!
//! Reconciles two tabular datasets: records present only in the source,
//! only in the target, or in both. Jobs run in the background, results are
//! rendered as JSON, CSV or HTML reports and can be sent to a recipient.

pub mod cli;
pub mod commands;
pub mod config;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod job;
pub mod loader;
pub mod notify;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod record;
pub mod report;
pub mod store;

pub use config::ReconcylConfig;
pub use coordinator::{JobCoordinator, JobOptions, SubmitRequest};
pub use engine::{ColumnPolicy, EngineOptions, ReconciliationEngine, ReconciliationResult};
pub use error::{FailureKind, ReconError, Result};
pub use job::{JobId, JobRecord, JobState, JobStatus};
pub use loader::{LoaderOptions, TableLoader};
pub use notify::{NotificationConfig, NotificationDispatcher, Transport};
pub use pipeline::{JobRunner, Pipeline};
pub use record::{Record, Scalar, Table};
pub use report::{RenderedReport, ReportFormat, ReportRenderer};
pub use store::{FileJobStore, JobStore, MemoryJobStore};
