//! Background execution of scrape tasks.

use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::models::task::{FailureKind, TaskFailure, TaskOutcome, TaskResult};
use crate::services::extractor::Extractor;
use crate::services::normalizer::Normalizer;
use crate::services::queue::JobReceiver;
use crate::services::task_store::{TaskStore, TaskStoreError};

/// Drives one task from `processing` to a terminal state.
pub struct TaskRunner {
    store: Arc<TaskStore>,
    extractor: Arc<dyn Extractor>,
    normalizer: Normalizer,
    source: String,
    extraction_timeout: Option<Duration>,
}

impl TaskRunner {
    pub fn new(
        store: Arc<TaskStore>,
        extractor: Arc<dyn Extractor>,
        normalizer: Normalizer,
        source: impl Into<String>,
        extraction_timeout: Option<Duration>,
    ) -> Self {
        Self {
            store,
            extractor,
            normalizer,
            source: source.into(),
            extraction_timeout,
        }
    }

    /// Execute the task and record its outcome.
    ///
    /// The work runs in its own tokio task so that a panic in the extractor
    /// or normalizer still ends in an `error` transition.
    pub async fn run(&self, task_id: &str) {
        info!(task_id = %task_id, "Processing scrape task");
        let start = Instant::now();

        let work = tokio::spawn(execute(
            self.extractor.clone(),
            self.normalizer.clone(),
            self.source.clone(),
            self.extraction_timeout,
        ));

        let outcome = match work.await {
            Ok(outcome) => outcome,
            Err(join_error) => {
                error!(task_id = %task_id, error = %join_error, "Scrape task aborted");
                TaskOutcome::Error(TaskFailure {
                    kind: FailureKind::Unknown,
                    message: format!("scrape aborted: {join_error}"),
                })
            }
        };

        metrics::histogram!("scrape_processing_seconds").record(start.elapsed().as_secs_f64());
        match &outcome {
            TaskOutcome::Success(result) => {
                metrics::counter!("scrape_tasks_completed").increment(1);
                info!(
                    task_id = %task_id,
                    records = result.records.len(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Scrape task completed"
                );
            }
            TaskOutcome::Error(failure) => {
                metrics::counter!("scrape_tasks_failed").increment(1);
                warn!(
                    task_id = %task_id,
                    kind = %failure.kind,
                    error = %failure.message,
                    "Scrape task failed"
                );
            }
        }

        match self.store.complete(task_id, outcome) {
            Ok(()) => {}
            Err(TaskStoreError::NotFound(_)) => {
                warn!(task_id = %task_id, "Task swept before completion, outcome dropped");
            }
            Err(e @ TaskStoreError::InvariantViolation { .. }) => {
                error!(task_id = %task_id, error = %e, "Task completion rejected");
            }
        }
    }
}

async fn execute(
    extractor: Arc<dyn Extractor>,
    normalizer: Normalizer,
    source: String,
    extraction_timeout: Option<Duration>,
) -> TaskOutcome {
    let extracted = match extraction_timeout {
        Some(limit) => match tokio::time::timeout(limit, extractor.extract()).await {
            Ok(extracted) => extracted,
            Err(_) => {
                return TaskOutcome::Error(TaskFailure {
                    kind: FailureKind::Timeout,
                    message: format!("extraction exceeded {}s", limit.as_secs()),
                })
            }
        },
        None => extractor.extract().await,
    };
    let raw = match extracted {
        Ok(raw) => raw,
        Err(e) => {
            return TaskOutcome::Error(TaskFailure {
                kind: e.kind.into(),
                message: e.message,
            })
        }
    };
    debug!(rows = raw.len(), "Raw rows received");

    match normalizer.normalize(raw) {
        Ok(records) => TaskOutcome::Success(TaskResult {
            records,
            extracted_at: Utc::now(),
            source,
        }),
        Err(e) => TaskOutcome::Error(TaskFailure {
            kind: FailureKind::MalformedRecord,
            message: e.to_string(),
        }),
    }
}

/// Start `count` workers pulling jobs off the queue until it closes.
pub fn spawn_workers(
    runner: Arc<TaskRunner>,
    jobs: JobReceiver,
    count: usize,
) -> Vec<JoinHandle<()>> {
    (0..count.max(1))
        .map(|worker_id| {
            let runner = runner.clone();
            let jobs = jobs.clone();
            tokio::spawn(async move {
                debug!(worker_id, "Scrape worker started");
                while let Some(job) = jobs.recv().await {
                    runner.run(&job.task_id).await;
                }
                info!(worker_id, "Job queue closed, scrape worker exiting");
            })
        })
        .collect()
}
