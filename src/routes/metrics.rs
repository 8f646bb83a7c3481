use axum::extract::State;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Prometheus scrape endpoint for the task counters.
pub async fn prometheus_metrics(State(handle): State<Arc<PrometheusHandle>>) -> impl IntoResponse {
    handle.render()
}

/// Install the global recorder and describe the task metrics.
pub fn install_recorder() -> Result<PrometheusHandle, metrics_exporter_prometheus::BuildError> {
    let handle = metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;

    ::metrics::describe_counter!("scrape_tasks_total", "Scrape tasks accepted");
    ::metrics::describe_counter!("scrape_tasks_completed", "Scrape tasks finished successfully");
    ::metrics::describe_counter!("scrape_tasks_failed", "Scrape tasks that ended in error");
    ::metrics::describe_counter!("scrape_tasks_swept", "Tasks removed by cleanup");
    ::metrics::describe_histogram!(
        "scrape_processing_seconds",
        "Time from worker pickup to task completion"
    );
    ::metrics::describe_gauge!("scrape_queue_depth", "Tasks waiting for a worker");

    Ok(handle)
}
