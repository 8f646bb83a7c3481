//! Task operations exposed to the HTTP layer.

use chrono::Duration;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::models::task::{FailureKind, ResultPayload, TaskFailure, TaskOutcome, TaskState, TaskView};
use crate::services::queue::{JobQueue, QueuedJob};
use crate::services::sweeper;
use crate::services::task_store::TaskStore;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ResultError {
    #[error("task {0} not found")]
    NotFound(String),

    #[error("task {0} is still processing")]
    NotReady(String),

    #[error("task {task_id} failed: {detail}")]
    Failed { task_id: String, detail: String },
}

/// Counters reported by the health endpoint.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct HealthSnapshot {
    pub queue_size: usize,
    pub active_tasks: usize,
    pub total_tasks: usize,
}

/// Creates, queries and expires scrape tasks.
#[derive(Clone)]
pub struct TaskService {
    store: Arc<TaskStore>,
    queue: JobQueue,
    retention: Duration,
}

impl TaskService {
    pub fn new(store: Arc<TaskStore>, queue: JobQueue, retention: Duration) -> Self {
        Self {
            store,
            queue,
            retention,
        }
    }

    pub fn store(&self) -> &Arc<TaskStore> {
        &self.store
    }

    /// Default age used by cleanup when the caller gives none.
    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Register a task and schedule it. The id is returned before any
    /// extraction work starts.
    pub fn create_task(&self) -> String {
        let task_id = self.store.create();
        metrics::counter!("scrape_tasks_total").increment(1);

        if let Err(e) = self.queue.enqueue(QueuedJob {
            task_id: task_id.clone(),
        }) {
            error!(task_id = %task_id, error = %e, "Scrape task could not be scheduled");
            if let Err(store_err) = self.store.complete(
                &task_id,
                TaskOutcome::Error(TaskFailure {
                    kind: FailureKind::Unknown,
                    message: e.to_string(),
                }),
            ) {
                warn!(
                    task_id = %task_id,
                    error = %store_err,
                    "Unscheduled task could not be marked failed"
                );
            }
        } else {
            info!(task_id = %task_id, "Scrape task queued");
        }

        task_id
    }

    pub fn get_task(&self, task_id: &str) -> Option<TaskView> {
        self.store.get(task_id).map(|task| task.view())
    }

    pub fn get_result(&self, task_id: &str) -> Result<ResultPayload, ResultError> {
        let task = self
            .store
            .get(task_id)
            .ok_or_else(|| ResultError::NotFound(task_id.to_string()))?;

        match &task.state {
            TaskState::Processing => Err(ResultError::NotReady(task_id.to_string())),
            TaskState::Error { failure, .. } => Err(ResultError::Failed {
                task_id: task_id.to_string(),
                detail: format!("{}: {}", failure.kind, failure.message),
            }),
            TaskState::Success { result, .. } => Ok(ResultPayload::from_result(task_id, result)),
        }
    }

    pub fn sweep(&self, max_age_seconds: u64) -> usize {
        let max_age = i64::try_from(max_age_seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX);
        sweeper::sweep(&self.store, max_age)
    }

    pub fn health(&self) -> HealthSnapshot {
        HealthSnapshot {
            queue_size: self.queue.depth(),
            active_tasks: self.store.active_count(),
            total_tasks: self.store.size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::NormalizedRecord;
    use crate::models::task::{TaskResult, TaskStatus};
    use chrono::Utc;

    fn service() -> (TaskService, crate::services::queue::JobReceiver) {
        let (queue, jobs) = JobQueue::new();
        let service = TaskService::new(Arc::new(TaskStore::new()), queue, Duration::hours(1));
        (service, jobs)
    }

    #[tokio::test]
    async fn test_create_enqueues_job() {
        let (service, jobs) = service();
        let id = service.create_task();

        assert_eq!(service.health().queue_size, 1);
        assert_eq!(jobs.recv().await.unwrap().task_id, id);
        assert_eq!(service.get_task(&id).unwrap().status, TaskStatus::Processing);
    }

    #[test]
    fn test_create_with_closed_queue_fails_task() {
        let (service, jobs) = service();
        drop(jobs);
        let id = service.create_task();

        let view = service.get_task(&id).unwrap();
        assert_eq!(view.status, TaskStatus::Error);
        assert_eq!(view.error_kind, Some(FailureKind::Unknown));
        assert!(view.completed_at.is_some());
        assert_eq!(service.health().active_tasks, 0);
    }

    #[test]
    fn test_result_states() {
        let (service, _jobs) = service();
        assert_eq!(
            service.get_result("task_0_0"),
            Err(ResultError::NotFound("task_0_0".to_string()))
        );

        let id = service.create_task();
        assert!(matches!(service.get_result(&id), Err(ResultError::NotReady(_))));

        service
            .store()
            .complete(
                &id,
                TaskOutcome::Success(TaskResult {
                    records: vec![NormalizedRecord {
                        full_name: "Ana Perez".to_string(),
                        birthday: "2026-02-01".to_string(),
                        phone: String::new(),
                        age: None,
                    }],
                    extracted_at: Utc::now(),
                    source: "HermessApp".to_string(),
                }),
            )
            .unwrap();

        let payload = service.get_result(&id).unwrap();
        assert_eq!(payload.metadata.total_records, 1);
        assert_eq!(payload.metadata.task_id, id);
    }

    #[test]
    fn test_failed_result() {
        let (service, _jobs) = service();
        let id = service.create_task();
        service
            .store()
            .complete(
                &id,
                TaskOutcome::Error(TaskFailure {
                    kind: FailureKind::LayoutMismatch,
                    message: "table missing".to_string(),
                }),
            )
            .unwrap();

        match service.get_result(&id) {
            Err(ResultError::Failed { detail, .. }) => {
                assert_eq!(detail, "layout_mismatch: table missing")
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_health_counts() {
        let (service, _jobs) = service();
        service.create_task();
        service.create_task();

        let health = service.health();
        assert_eq!(health.active_tasks, 2);
        assert_eq!(health.total_tasks, 2);
        assert_eq!(health.queue_size, 2);
    }

    #[test]
    fn test_sweep_huge_age_keeps_tasks() {
        let (service, _jobs) = service();
        service.create_task();
        assert_eq!(service.sweep(u64::MAX), 0);
        assert_eq!(service.sweep(0), 1);
    }
}
