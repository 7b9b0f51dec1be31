#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use imgflow_core::image::{DEFAULT_MAX_IMAGE_BYTES, REFERENCE_IMAGE};
use imgflow_core::task::Family;
use imgflow_core::types::TaskKey;
use imgflow_worker::callback::{CallbackError, CallbackReport, CallbackScheduler, CallbackSink};
use imgflow_worker::config::WorkerConfig;
use imgflow_worker::router::build_worker_router;
use imgflow_worker::state::WorkerState;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tower::ServiceExt;

/// Callback delay used by every test app.
pub const TEST_CALLBACK_DELAY: Duration = Duration::from_millis(20);

/// Build a test `WorkerConfig` for `family` with a short callback delay.
pub fn test_config(family: Family) -> WorkerConfig {
    WorkerConfig {
        family,
        host: "127.0.0.1".to_string(),
        port: 0,
        orchestrator_url: "http://127.0.0.1:9".to_string(),
        callback_delay: TEST_CALLBACK_DELAY,
        max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        body_limit_bytes: 16 * 1024 * 1024,
        request_timeout_secs: 30,
    }
}

/// Callback sink that keeps every report instead of sending it.
#[derive(Default)]
pub struct RecordingSink {
    pub sent: Mutex<Vec<(TaskKey, CallbackReport)>>,
}

#[async_trait]
impl CallbackSink for RecordingSink {
    async fn send(&self, key: &TaskKey, report: &CallbackReport) -> Result<(), CallbackError> {
        self.sent.lock().await.push((key.clone(), report.clone()));
        Ok(())
    }
}

/// A worker app plus handles on its callback machinery.
pub struct TestWorker {
    pub app: Router,
    pub sink: Arc<RecordingSink>,
    pub callbacks: Arc<CallbackScheduler>,
}

/// Build the full worker router, recording callbacks instead of sending them.
pub fn build_test_app(family: Family) -> TestWorker {
    let config = test_config(family);
    let sink = Arc::new(RecordingSink::default());
    let callbacks = Arc::new(CallbackScheduler::new(sink.clone(), config.callback_delay));

    let state = WorkerState {
        config: Arc::new(config.clone()),
        callbacks: Arc::clone(&callbacks),
    };

    TestWorker {
        app: build_worker_router(state, &config),
        sink,
        callbacks,
    }
}

/// Processing request for the filter worker.
pub fn filter_request(party_id: &str, task_id: &str, image: &str) -> Value {
    json!({
        "metadata": { "party_id": party_id, "task_id": task_id },
        "data": {
            "Image": image,
            "transformation": "filter",
            "type_id": "3",
            "filter_name": "Sepia",
        },
    })
}

/// Processing request for the effect worker.
pub fn effect_request(party_id: &str, task_id: &str, direction: &str) -> Value {
    json!({
        "metadata": { "party_id": party_id, "task_id": task_id },
        "data": {
            "Image": REFERENCE_IMAGE,
            "transformation": "effect",
            "type_id": "1",
            "direction": direction,
        },
    })
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: &Value) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
