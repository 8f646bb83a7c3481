use chrono::Duration;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::services::task_store::TaskStore;

/// Remove tasks older than `max_age`; returns how many were removed.
pub fn sweep(store: &TaskStore, max_age: Duration) -> usize {
    let removed = store.delete_expired(max_age);
    metrics::counter!("scrape_tasks_swept").increment(removed as u64);
    info!(
        removed,
        remaining = store.size(),
        max_age_secs = max_age.num_seconds(),
        "Task cleanup finished"
    );
    removed
}

/// Sweep on a fixed interval in addition to explicit cleanup calls.
pub fn spawn_periodic_sweep(
    store: Arc<TaskStore>,
    every: std::time::Duration,
    max_age: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            debug!("Periodic task sweep");
            sweep(&store, max_age);
        }
    })
}
