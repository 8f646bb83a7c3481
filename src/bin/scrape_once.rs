//! Run a single extraction and print the download payload to stdout.

use birthday_scraper::{
    config::AppConfig,
    models::task::{ResultPayload, TaskResult},
    services::{
        extractor::{Extractor, HermessClient},
        normalizer::Normalizer,
    },
};
use chrono::Utc;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so stdout stays valid JSON.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::from_env().expect("Failed to load configuration");
    let client =
        HermessClient::new(config.hermess_settings()).expect("Failed to initialize HermessApp client");

    let raw = match client.extract().await {
        Ok(raw) => raw,
        Err(e) => {
            tracing::error!(kind = %e.kind, error = %e.message, "Extraction failed");
            return ExitCode::FAILURE;
        }
    };

    let records = match Normalizer::new().normalize(raw) {
        Ok(records) => records,
        Err(e) => {
            tracing::error!(error = %e, "Normalization failed");
            return ExitCode::FAILURE;
        }
    };

    let result = TaskResult {
        records,
        extracted_at: Utc::now(),
        source: config.source_label.clone(),
    };
    let payload = ResultPayload::from_result("cli", &result);

    match serde_json::to_string_pretty(&payload) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize payload");
            ExitCode::FAILURE
        }
    }
}
