use axum::extract::{Query, State};
use axum::Json;
use garde::Validate;

use crate::app_state::AppState;
use crate::models::api::{CleanupRequest, CleanupResponse};
use crate::routes::error::ApiError;

/// POST /cleanup — drop tasks older than `max_age_secs` (default: retention).
pub async fn cleanup_tasks(
    State(state): State<AppState>,
    Query(request): Query<CleanupRequest>,
) -> Result<Json<CleanupResponse>, ApiError> {
    request
        .validate()
        .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;

    let max_age_secs = request
        .max_age_secs
        .unwrap_or_else(|| state.tasks.retention().num_seconds().max(0) as u64);
    let cleaned_tasks = state.tasks.sweep(max_age_secs);

    Ok(Json(CleanupResponse {
        success: true,
        cleaned_tasks,
        remaining_tasks: state.tasks.health().total_tasks,
    }))
}
