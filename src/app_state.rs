use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::AppConfig;
use crate::services::{
    extractor::Extractor,
    normalizer::Normalizer,
    queue::JobQueue,
    runner::{self, TaskRunner},
    sweeper,
    task_store::TaskStore,
    tasks::TaskService,
};

/// Knobs for the background side of the service.
#[derive(Debug, Clone)]
pub struct ServiceOptions {
    pub source_label: String,
    pub worker_count: usize,
    pub extraction_timeout: Option<Duration>,
    pub retention: chrono::Duration,
    pub sweep_interval: Option<Duration>,
}

impl From<&AppConfig> for ServiceOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            source_label: config.source_label.clone(),
            worker_count: config.worker_count,
            extraction_timeout: config.extraction_timeout_secs.map(Duration::from_secs),
            retention: config.retention(),
            sweep_interval: config.sweep_interval_secs.map(Duration::from_secs),
        }
    }
}

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub tasks: TaskService,
    pub environment: Arc<str>,
}

impl AppState {
    pub fn new(tasks: TaskService, environment: &str) -> Self {
        Self {
            tasks,
            environment: Arc::from(environment),
        }
    }

    /// Wire store, queue, workers and the optional periodic sweep.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        store: Arc<TaskStore>,
        extractor: Arc<dyn Extractor>,
        normalizer: Normalizer,
        options: &ServiceOptions,
        environment: &str,
    ) -> Self {
        let (queue, jobs) = JobQueue::new();
        let runner = Arc::new(TaskRunner::new(
            store.clone(),
            extractor,
            normalizer,
            options.source_label.clone(),
            options.extraction_timeout,
        ));
        runner::spawn_workers(runner, jobs, options.worker_count);
        info!(workers = options.worker_count.max(1), "Scrape workers started");

        if let Some(every) = options.sweep_interval {
            sweeper::spawn_periodic_sweep(store.clone(), every, options.retention);
            info!(interval_secs = every.as_secs(), "Periodic task sweep enabled");
        }

        Self::new(TaskService::new(store, queue, options.retention), environment)
    }
}
