//! Test helper utilities: fake extractors and polling.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use birthday_scraper::{
    app_state::{AppState, ServiceOptions},
    models::{record::RawRecord, task::TaskView},
    services::{
        extractor::{ExtractionError, Extractor},
        normalizer::Normalizer,
        task_store::TaskStore,
        tasks::TaskService,
    },
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tower::ServiceExt;

/// Extractor returning a fixed outcome, optionally held until released.
pub struct FakeExtractor {
    outcome: Result<Vec<RawRecord>, ExtractionError>,
    gate: Option<Arc<Semaphore>>,
    pub calls: AtomicUsize,
}

impl FakeExtractor {
    pub fn returning(outcome: Result<Vec<RawRecord>, ExtractionError>) -> Self {
        Self {
            outcome,
            gate: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Blocks each extraction until a permit is added to `gate`.
    pub fn gated(outcome: Result<Vec<RawRecord>, ExtractionError>, gate: Arc<Semaphore>) -> Self {
        Self {
            outcome,
            gate: Some(gate),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Extractor for FakeExtractor {
    async fn extract(&self) -> Result<Vec<RawRecord>, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        self.outcome.clone()
    }
}

pub fn raw(name: &str, birthday: &str, phone: &str, age: &str) -> RawRecord {
    RawRecord {
        name: name.to_string(),
        birthday: birthday.to_string(),
        phone: phone.to_string(),
        age: age.to_string(),
    }
}

/// Three rows, the third a duplicate of the first under (name, birthday).
pub fn rows_with_duplicate() -> Vec<RawRecord> {
    vec![
        raw("LOPEZ PEREZ ANA MARIA", "14/03", "3001234567", "34"),
        raw("GOMEZ RUIZ PEDRO", "02/03", "3109876543", "51"),
        raw("LOPEZ PEREZ ANA MARIA", "14/03", "3001234567", "34"),
    ]
}

pub fn options() -> ServiceOptions {
    ServiceOptions {
        source_label: "HermessApp".to_string(),
        worker_count: 2,
        extraction_timeout: Some(Duration::from_secs(10)),
        retention: chrono::Duration::hours(1),
        sweep_interval: None,
    }
}

pub fn start_state(store: Arc<TaskStore>, extractor: Arc<dyn Extractor>) -> AppState {
    AppState::start(
        store,
        extractor,
        Normalizer::for_year(2026),
        &options(),
        "test",
    )
}

/// Poll until the task leaves `processing`.
pub async fn wait_for_completion(tasks: &TaskService, task_id: &str) -> TaskView {
    for _ in 0..500 {
        match tasks.get_task(task_id) {
            Some(view) if view.completed_at.is_some() => return view,
            Some(_) => tokio::time::sleep(Duration::from_millis(10)).await,
            None => panic!("task {task_id} disappeared while waiting"),
        }
    }
    panic!("task {task_id} did not complete within 5 seconds");
}

/// Send a request through the router and decode the JSON body.
pub async fn send(app: &Router, method: &str, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}
