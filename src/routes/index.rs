use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::app_state::AppState;

/// GET / — service description and endpoint list.
pub async fn index(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "message": "HermessApp birthday scraper API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "/scrape": "POST - start a birthday scrape",
            "/status/{task_id}": "GET - task status",
            "/download/{task_id}": "GET - download the scraped birthdays as JSON",
            "/health": "GET - service health",
            "/cleanup": "POST - remove old tasks (optional ?max_age_secs=)",
        },
        "environment": state.environment.as_ref(),
    }))
}
