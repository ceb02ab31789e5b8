//! Job records and their state machine

use crate::engine::ReconciliationResult;
use crate::error::{FailureKind, ReconError, Result};
use crate::report::ReportFormat;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identity of a submitted job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for JobId {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| ReconError::invalid_input(format!("'{}' is not a valid job id", s)))
    }
}

/// Lifecycle state: `Pending -> Running -> Succeeded | Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Whether moving from `self` to `next` respects the state machine
    pub fn can_transition_to(&self, next: JobState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Running, Self::Succeeded)
                | (Self::Running, Self::Failed)
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Why a job failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl From<&ReconError> for JobFailure {
    fn from(err: &ReconError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Persisted view of one job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    pub state: JobState,
    pub format: ReportFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify: Option<String>,
    pub submitted_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ReconciliationResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<JobFailure>,
}

impl JobRecord {
    pub fn new(format: ReportFormat, notify: Option<String>) -> Self {
        Self {
            id: JobId::new(),
            state: JobState::Pending,
            format,
            notify,
            submitted_at: Utc::now(),
            started_at: None,
            finished_at: None,
            result: None,
            failure: None,
        }
    }

    /// Copy of this record moved to `Running`
    pub fn started(&self) -> Self {
        Self {
            state: JobState::Running,
            started_at: Some(Utc::now()),
            ..self.clone()
        }
    }

    /// Copy of this record moved to `Succeeded` with its result
    pub fn succeeded(&self, result: ReconciliationResult) -> Self {
        Self {
            state: JobState::Succeeded,
            finished_at: Some(Utc::now()),
            result: Some(result),
            ..self.clone()
        }
    }

    /// Copy of this record moved to `Failed`
    pub fn failed(&self, failure: JobFailure) -> Self {
        Self {
            state: JobState::Failed,
            finished_at: Some(Utc::now()),
            failure: Some(failure),
            ..self.clone()
        }
    }

    pub fn status(&self) -> JobStatus {
        match self.state {
            JobState::Pending => JobStatus::Pending,
            JobState::Running => JobStatus::Running,
            JobState::Succeeded => match &self.result {
                Some(result) => JobStatus::Succeeded {
                    result: result.clone(),
                },
                None => JobStatus::Failed {
                    failure: JobFailure {
                        kind: FailureKind::Internal,
                        message: "job succeeded without a stored result".to_string(),
                    },
                },
            },
            JobState::Failed => JobStatus::Failed {
                failure: self.failure.clone().unwrap_or(JobFailure {
                    kind: FailureKind::Internal,
                    message: "job failed without a recorded reason".to_string(),
                }),
            },
        }
    }
}

/// What a poller sees for a job
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded { result: ReconciliationResult },
    Failed { failure: JobFailure },
}

impl JobStatus {
    pub fn state(&self) -> JobState {
        match self {
            Self::Pending => JobState::Pending,
            Self::Running => JobState::Running,
            Self::Succeeded { .. } => JobState::Succeeded,
            Self::Failed { .. } => JobState::Failed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }
}

/// Wire shape for pollers: pending and running both read as `processing`
#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum PollView<'a> {
    Processing { state: JobState },
    Succeeded { result: &'a ReconciliationResult },
    Failed { error: &'a JobFailure },
}

impl Serialize for JobStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let view = match self {
            Self::Pending | Self::Running => PollView::Processing { state: self.state() },
            Self::Succeeded { result } => PollView::Succeeded { result },
            Self::Failed { failure } => PollView::Failed { error: failure },
        };
        view.serialize(serializer)
    }
}
