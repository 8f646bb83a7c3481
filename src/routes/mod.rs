pub mod cleanup;
pub mod error;
pub mod health;
pub mod index;
pub mod metrics;
pub mod scrape;

use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;

/// API routes with the standard middleware stack.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index::index))
        .route("/health", get(health::health_check))
        .route("/scrape", post(scrape::start_scrape))
        .route("/status/{task_id}", get(scrape::get_status))
        .route("/download/{task_id}", get(scrape::download))
        .route("/cleanup", post(cleanup::cleanup_tasks))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(64 * 1024))
}
