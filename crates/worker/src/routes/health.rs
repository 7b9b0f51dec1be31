use axum::extract::State;
use axum::{routing::get, Json, Router};
use imgflow_core::task::Family;
use serde::Serialize;

use crate::state::WorkerState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Transformation family served by this worker.
    pub family: Family,
    /// Callbacks scheduled but not yet delivered.
    pub pending_callbacks: usize,
}

/// Service description served at `/`.
#[derive(Serialize)]
pub struct ServiceInfo {
    pub service: &'static str,
    pub family: Family,
    pub version: &'static str,
    pub endpoints: [&'static str; 2],
}

async fn health_check(State(state): State<WorkerState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        family: state.config.family,
        pending_callbacks: state.callbacks.pending_count().await,
    })
}

async fn service_info(State(state): State<WorkerState>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: "imgflow-worker",
        family: state.config.family,
        version: env!("CARGO_PKG_VERSION"),
        endpoints: ["POST /api/v1/actions", "POST /api/v1/actions/cancel"],
    })
}

/// Mount root-level routes (NOT under `/api/v1`).
pub fn router() -> Router<WorkerState> {
    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health_check))
}
