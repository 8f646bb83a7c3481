use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{Datelike, Utc};

use crate::app_state::AppState;
use crate::models::api::{ScrapeResponse, TaskStatusResponse};
use crate::routes::error::ApiError;

const SPANISH_MONTHS: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

/// POST /scrape — start a scraping task in the background.
pub async fn start_scrape(State(state): State<AppState>) -> (StatusCode, Json<ScrapeResponse>) {
    let task_id = state.tasks.create_task();

    (
        StatusCode::ACCEPTED,
        Json(ScrapeResponse {
            success: true,
            status_url: format!("/status/{task_id}"),
            download_url: format!("/download/{task_id}"),
            message: "Scraping started".to_string(),
            task_id,
        }),
    )
}

/// GET /status/{task_id} — current state of a task.
pub async fn get_status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskStatusResponse>, ApiError> {
    let task = state
        .tasks
        .get_task(&task_id)
        .ok_or(ApiError::NotFound(task_id))?;

    Ok(Json(TaskStatusResponse {
        success: true,
        task,
    }))
}

/// GET /download/{task_id} — the normalized dataset as a JSON attachment.
pub async fn download(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Response, ApiError> {
    let payload = state.tasks.get_result(&task_id)?;
    let body = serde_json::to_vec_pretty(&payload)
        .map_err(|e| ApiError::Internal(format!("serializing task {task_id}: {e}")))?;

    let filename = download_filename(&task_id, Utc::now().month());
    tracing::info!(task_id = %task_id, records = payload.metadata.total_records, "Serving download");

    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response())
}

/// `cumpleanos_<month in Spanish>_<task_id>.json`
pub fn download_filename(task_id: &str, month: u32) -> String {
    let month_name = SPANISH_MONTHS
        .get(month.saturating_sub(1) as usize)
        .copied()
        .unwrap_or("mes");
    format!("cumpleanos_{month_name}_{task_id}.json")
}
