use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

use super::record::NormalizedRecord;

/// Externally visible status of a scraping task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TaskStatus {
    Processing,
    Success,
    Error,
}

/// Classification of a failed task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FailureKind {
    AuthFailure,
    Timeout,
    LayoutMismatch,
    NetworkError,
    MalformedRecord,
    Unknown,
}

/// Staged output of a successful task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskResult {
    pub records: Vec<NormalizedRecord>,
    pub extracted_at: DateTime<Utc>,
    pub source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskFailure {
    pub kind: FailureKind,
    pub message: String,
}

/// What the runner hands to the store when a task finishes.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    Success(TaskResult),
    Error(TaskFailure),
}

/// Lifecycle state. The payload lives on the variant so a result can only
/// exist on a successful task and a completion time only on a terminal one.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskState {
    Processing,
    Success {
        completed_at: DateTime<Utc>,
        result: TaskResult,
    },
    Error {
        completed_at: DateTime<Utc>,
        failure: TaskFailure,
    },
}

/// A scraping task as owned by the task store.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub message: String,
    pub state: TaskState,
}

impl Task {
    pub fn new(id: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            created_at,
            message: "Scraping started".to_string(),
            state: TaskState::Processing,
        }
    }

    pub fn status(&self) -> TaskStatus {
        match self.state {
            TaskState::Processing => TaskStatus::Processing,
            TaskState::Success { .. } => TaskStatus::Success,
            TaskState::Error { .. } => TaskStatus::Error,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self.state, TaskState::Processing)
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        match &self.state {
            TaskState::Processing => None,
            TaskState::Success { completed_at, .. } | TaskState::Error { completed_at, .. } => {
                Some(*completed_at)
            }
        }
    }

    pub fn result(&self) -> Option<&TaskResult> {
        match &self.state {
            TaskState::Success { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&TaskFailure> {
        match &self.state {
            TaskState::Error { failure, .. } => Some(failure),
            _ => None,
        }
    }

    /// Timestamp the retention window is measured from.
    pub fn reference_time(&self) -> DateTime<Utc> {
        self.completed_at().unwrap_or(self.created_at)
    }

    pub fn view(&self) -> TaskView {
        TaskView {
            task_id: self.id.clone(),
            status: self.status(),
            message: self.message.clone(),
            created_at: self.created_at,
            completed_at: self.completed_at(),
            record_count: self.result().map(|r| r.records.len()),
            error_kind: self.failure().map(|f| f.kind),
            has_data: self.result().is_some(),
        }
    }
}

/// Read-only snapshot returned to status pollers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskView {
    pub task_id: String,
    pub status: TaskStatus,
    pub message: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<FailureKind>,
    pub has_data: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultMetadata {
    pub extraction_time: DateTime<Utc>,
    pub total_records: usize,
    pub source: String,
    pub date_format: String,
    pub task_id: String,
}

/// Download payload; the one serialization contract clients depend on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultPayload {
    pub metadata: ResultMetadata,
    pub records: Vec<NormalizedRecord>,
}

impl ResultPayload {
    pub fn from_result(task_id: &str, result: &TaskResult) -> Self {
        Self {
            metadata: ResultMetadata {
                extraction_time: result.extracted_at,
                total_records: result.records.len(),
                source: result.source.clone(),
                date_format: "YYYY-MM-DD".to_string(),
                task_id: task_id.to_string(),
            },
            records: result.records.clone(),
        }
    }
}
