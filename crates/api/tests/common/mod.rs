#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use imgflow_api::config::ServerConfig;
use imgflow_api::router::build_app_router;
use imgflow_api::state::AppState;
use imgflow_api::worker_client::{DispatchAck, DispatchError, WorkerClient, WorkerEndpoints};
use imgflow_core::image::REFERENCE_IMAGE;
use imgflow_core::task::Family;
use imgflow_core::types::TaskKey;
use imgflow_store::{DispatchRecord, TaskStore};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tower::ServiceExt;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        body_limit_bytes: 16 * 1024 * 1024,
        workers: WorkerEndpoints {
            filter_url: "http://127.0.0.1:9".to_string(),
            effect_url: "http://127.0.0.1:9".to_string(),
        },
        dispatch_interval: Duration::from_millis(20),
        dispatch_deadline: Duration::from_secs(60),
        reference_image: REFERENCE_IMAGE.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Fake worker client
// ---------------------------------------------------------------------------

/// How [`FakeWorkerClient`] answers dispatches.
#[derive(Debug, Clone, Copy)]
pub enum FakeOutcome {
    Accept,
    Reject {
        status: u16,
        code: &'static str,
        message: &'static str,
    },
}

/// Worker client that records calls instead of making them.
pub struct FakeWorkerClient {
    pub outcome: Mutex<FakeOutcome>,
    /// `(key, family, image)` for every dispatch.
    pub dispatched: Mutex<Vec<(TaskKey, Family, String)>>,
    /// `(key, family)` for every cancel.
    pub cancelled: Mutex<Vec<(TaskKey, Family)>>,
}

impl FakeWorkerClient {
    pub fn new(outcome: FakeOutcome) -> Self {
        Self {
            outcome: Mutex::new(outcome),
            dispatched: Mutex::new(Vec::new()),
            cancelled: Mutex::new(Vec::new()),
        }
    }

    pub fn accepting() -> Self {
        Self::new(FakeOutcome::Accept)
    }
}

#[async_trait]
impl WorkerClient for FakeWorkerClient {
    async fn dispatch(
        &self,
        record: &DispatchRecord,
        image: &str,
    ) -> Result<DispatchAck, DispatchError> {
        let family = record.transformation.family();
        self.dispatched
            .lock()
            .await
            .push((record.key.clone(), family, image.to_string()));

        match *self.outcome.lock().await {
            FakeOutcome::Accept => Ok(DispatchAck {
                family,
                status: 200,
            }),
            FakeOutcome::Reject {
                status,
                code,
                message,
            } => Err(DispatchError::Rejected {
                status,
                code: code.to_string(),
                message: message.to_string(),
            }),
        }
    }

    async fn cancel(&self, key: &TaskKey, family: Family) -> Result<(), DispatchError> {
        self.cancelled.lock().await.push((key.clone(), family));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

/// The orchestrator router plus handles on its store and worker client.
pub struct TestApp {
    pub app: Router,
    pub store: Arc<TaskStore>,
    pub worker: Arc<FakeWorkerClient>,
}

/// Build the full orchestrator router, backed by a fresh store and a
/// [`FakeWorkerClient`].
pub fn build_test_app() -> TestApp {
    let config = test_config();
    let store = Arc::new(TaskStore::new());
    let worker = Arc::new(FakeWorkerClient::accepting());

    let state = AppState {
        store: Arc::clone(&store),
        worker_client: worker.clone(),
    };

    TestApp {
        app: build_app_router(state, &config),
        store,
        worker,
    }
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

pub fn create_filter_body(party_id: &str) -> Value {
    json!({
        "metadata": { "party_id": party_id },
        "data": {
            "transformation": "filter",
            "type_id": "3",
            "filter_name": "Sepia",
        },
    })
}

pub fn create_effect_body(party_id: &str, direction: &str) -> Value {
    json!({
        "metadata": { "party_id": party_id },
        "data": {
            "transformation": "effect",
            "type_id": "1",
            "direction": direction,
        },
    })
}

pub fn success_callback(party_id: &str, task_id: &str, image: &str) -> Value {
    json!({
        "metadata": { "party_id": party_id, "task_id": task_id },
        "data": { "success": true, "image": image },
    })
}

pub fn failure_callback(party_id: &str, task_id: &str, code: &str, message: &str) -> Value {
    json!({
        "metadata": { "party_id": party_id, "task_id": task_id },
        "data": { "success": false, "code": code, "message": message },
    })
}

pub fn task_uri(party_id: &str, task_id: &str) -> String {
    format!("/api/v1/actions?party_id={party_id}&task_id={task_id}")
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

pub async fn send(app: Router, method: Method, uri: &str, body: Option<&Value>) -> Response<Body> {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None).await
}

pub async fn post_json(app: Router, uri: &str, body: &Value) -> Response<Body> {
    send(app, Method::POST, uri, Some(body)).await
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, None).await
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Create a filter task through the API and return its task id.
pub async fn create_task(app: &Router, party_id: &str) -> String {
    let response = post_json(app.clone(), "/api/v1/actions", &create_filter_body(party_id)).await;
    let json = body_json(response).await;
    json["data"]["task_id"].as_str().unwrap().to_string()
}
