//! Handlers for the worker's `/actions` resource.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use imgflow_core::envelope::{Envelope, Metadata};
use serde::{Deserialize, Serialize};

use crate::callback::CallbackReport;
use crate::error::WorkerError;
use crate::processor::{self, ProcessData, ProcessedData};
use crate::state::WorkerState;

/// Body of `POST /actions/cancel`.
#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    #[serde(default)]
    pub metadata: Metadata,
}

/// `data` block of the cancel response.
#[derive(Debug, Serialize)]
pub struct CancelData {
    pub success: bool,
    pub cancelled: bool,
}

/// POST /api/v1/actions
///
/// Validate and transform an image, answer synchronously, and schedule the
/// callback that reports the outcome to the orchestrator. Rejected requests
/// schedule a failure callback when the task identity is known.
pub async fn process_task(
    State(state): State<WorkerState>,
    payload: Result<Json<Envelope<ProcessData>>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::warn!(error = %rejection.body_text(), "Unreadable processing request");
            return rejection_error(&state, rejection).into_response();
        }
    };
    let metadata = request.metadata.clone();

    match processor::process_task(state.config.family, state.config.max_image_bytes, &request) {
        Ok(done) => {
            tracing::info!(key = %done.key, "Task processed");
            state
                .callbacks
                .schedule(done.key, CallbackReport::completed(done.image.clone()))
                .await;

            let data = ProcessedData {
                success: true,
                image: done.image,
            };
            (StatusCode::OK, Json(Envelope::new(metadata, data))).into_response()
        }
        Err(err) => {
            tracing::warn!(
                party_id = ?metadata.party_id,
                task_id = ?metadata.task_id,
                code = err.code(),
                error = %err,
                "Task rejected",
            );

            if err.reports_task_failure() {
                if let Some(key) = metadata.task_key() {
                    let report = CallbackReport::failed(err.code(), err.public_message());
                    state.callbacks.schedule(key, report).await;
                }
            }

            err.into_response_with(metadata)
        }
    }
}

/// Map a body that could not be read as JSON. A body cut off by the
/// request size limit is reported as an oversized image, not a malformed one.
fn rejection_error(state: &WorkerState, rejection: JsonRejection) -> WorkerError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        // The body was cut off at the limit, so its size is at least that.
        return WorkerError::PayloadTooLarge {
            size: state.config.body_limit_bytes,
            max: state.config.max_image_bytes,
        };
    }
    WorkerError::Validation(rejection.body_text())
}

/// POST /api/v1/actions/cancel
///
/// Drop the pending callback for a task, if it has not fired yet.
pub async fn cancel_callback(
    State(state): State<WorkerState>,
    payload: Result<Json<CancelRequest>, JsonRejection>,
) -> Result<impl IntoResponse, WorkerError> {
    let Json(request) = payload.map_err(|r| WorkerError::Validation(r.body_text()))?;
    let key = request.metadata.task_key().ok_or_else(|| {
        WorkerError::Validation("\"metadata.party_id\" and \"metadata.task_id\" are required".into())
    })?;

    let cancelled = state.callbacks.cancel(&key).await;
    tracing::info!(%key, cancelled, "Callback cancellation requested");

    let data = CancelData {
        success: true,
        cancelled,
    };
    Ok(Json(Envelope::new(request.metadata, data)))
}
