//! In-memory task registry.
//!
//! Every operation takes the registry lock for the duration of a single map
//! operation only. Callers receive clones, so a reader never observes a task
//! halfway through a completion.

use chrono::Duration;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error, info};

use crate::models::task::{Task, TaskOutcome, TaskState};
use crate::services::clock::{Clock, SystemClock};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TaskStoreError {
    #[error("task {0} not found")]
    NotFound(String),

    #[error("task store invariant violated for {task_id}: {reason}")]
    InvariantViolation { task_id: String, reason: String },
}

/// Process-wide registry of scraping tasks.
pub struct TaskStore {
    tasks: Mutex<HashMap<String, Task>>,
    next_seq: AtomicU64,
    clock: Arc<dyn Clock>,
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            tasks: Mutex::new(HashMap::new()),
            next_seq: AtomicU64::new(1),
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Task>> {
        // A panic while holding the lock cannot leave a half-written task:
        // every mutation is a single insert, replace or remove.
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a new task in `processing` state and return its id.
    pub fn create(&self) -> String {
        let now = self.clock.now();
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let task_id = format!("task_{}_{}", now.timestamp(), seq);

        self.lock()
            .insert(task_id.clone(), Task::new(task_id.clone(), now));

        debug!(task_id = %task_id, "Task registered");
        task_id
    }

    pub fn get(&self, task_id: &str) -> Option<Task> {
        self.lock().get(task_id).cloned()
    }

    /// Move a task into its terminal state.
    ///
    /// Fails without touching the record if the task is unknown or already
    /// terminal.
    pub fn complete(&self, task_id: &str, outcome: TaskOutcome) -> Result<(), TaskStoreError> {
        let completed_at = self.clock.now();
        let mut tasks = self.lock();

        let task = tasks
            .get_mut(task_id)
            .ok_or_else(|| TaskStoreError::NotFound(task_id.to_string()))?;

        if task.is_terminal() {
            let err = TaskStoreError::InvariantViolation {
                task_id: task_id.to_string(),
                reason: format!("completion attempted on task already in {}", task.status()),
            };
            error!(task_id = %task_id, error = %err, "Duplicate task completion rejected");
            return Err(err);
        }

        let (state, message) = match outcome {
            TaskOutcome::Success(result) => (
                TaskState::Success {
                    completed_at,
                    result,
                },
                "Scraping completed successfully".to_string(),
            ),
            TaskOutcome::Error(failure) => {
                let message = format!("{}: {}", failure.kind, failure.message);
                (
                    TaskState::Error {
                        completed_at,
                        failure,
                    },
                    message,
                )
            }
        };
        task.state = state;
        task.message = message;

        Ok(())
    }

    /// Remove every task whose reference time is at least `max_age` old.
    pub fn delete_expired(&self, max_age: Duration) -> usize {
        let now = self.clock.now();
        let mut tasks = self.lock();
        let before = tasks.len();

        tasks.retain(|_, task| now - task.reference_time() < max_age);

        let removed = before - tasks.len();
        if removed > 0 {
            info!(removed, remaining = tasks.len(), "Expired tasks removed");
        }
        removed
    }

    pub fn size(&self) -> usize {
        self.lock().len()
    }

    /// Number of tasks still in `processing`.
    pub fn active_count(&self) -> usize {
        self.lock().values().filter(|t| !t.is_terminal()).count()
    }
}
