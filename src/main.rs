use axum::routing::get;
use birthday_scraper::{
    app_state::{AppState, ServiceOptions},
    config::AppConfig,
    routes,
    services::{extractor::HermessClient, normalizer::Normalizer, task_store::TaskStore},
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!(
        environment = %config.environment,
        workers = config.worker_count,
        "Initializing birthday-scraper server"
    );

    let prometheus_handle =
        Arc::new(routes::metrics::install_recorder().expect("Failed to install Prometheus recorder"));

    let extractor =
        HermessClient::new(config.hermess_settings()).expect("Failed to initialize HermessApp client");

    let state = AppState::start(
        Arc::new(TaskStore::new()),
        Arc::new(extractor),
        Normalizer::new(),
        &ServiceOptions::from(&config),
        &config.environment,
    );

    let app = routes::router(state).route(
        "/metrics",
        get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
    );

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, in-memory tasks will be discarded");
}
