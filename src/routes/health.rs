use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::app_state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub environment: String,
    pub queue_size: usize,
    pub active_tasks: usize,
    pub total_tasks: usize,
}

/// GET /health — liveness plus task registry counters.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let snapshot = state.tasks.health();

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        environment: state.environment.to_string(),
        queue_size: snapshot.queue_size,
        active_tasks: snapshot.active_tasks,
        total_tasks: snapshot.total_tasks,
    })
}
