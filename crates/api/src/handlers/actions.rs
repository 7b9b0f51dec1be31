//! Handlers for the `/actions` resource.
//!
//! Clients create, poll, and delete tasks here; workers report results
//! through the callback endpoint.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use imgflow_core::envelope::{Envelope, Metadata};
use imgflow_core::error::CoreError;
use imgflow_core::task::{Family, TaskStatus, Transformation};
use imgflow_core::types::TaskKey;
use imgflow_store::Transition;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::response::{envelope, ActionData};
use crate::state::AppState;

/// Shown to clients polling a failed task that carries no message.
pub const DEFAULT_ERROR_MESSAGE: &str = "An error occurred while transforming the image";

/// Code recorded when a worker reports a failure without one.
const DEFAULT_ERROR_CODE: &str = "WORKER_ERROR";

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// `data` block of `POST /actions`.
#[derive(Debug, Deserialize)]
pub struct CreateTaskData {
    pub transformation: Option<String>,
    pub type_id: Option<String>,
    pub filter_name: Option<String>,
    pub direction: Option<String>,
    /// Image to transform. The reference image is used when absent.
    pub image: Option<String>,
}

/// `data` block of `POST /actions/callback`.
#[derive(Debug, Deserialize)]
pub struct CallbackData {
    pub success: bool,
    pub image: Option<String>,
    pub code: Option<String>,
    pub message: Option<String>,
}

/// Query parameters identifying a task (`?party_id=&task_id=`).
#[derive(Debug, Deserialize)]
pub struct TaskQuery {
    pub party_id: Option<String>,
    pub task_id: Option<String>,
}

impl TaskQuery {
    fn metadata(&self) -> Metadata {
        Metadata {
            party_id: self.party_id.clone(),
            task_id: self.task_id.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn require_key(metadata: &Metadata) -> AppResult<TaskKey> {
    metadata.task_key().ok_or_else(|| {
        AppError::Core(CoreError::Validation(
            "party_id and task_id are both required".into(),
        ))
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

/// POST /api/v1/actions
///
/// Create a task in `inProgress`. The dispatcher picks it up on its next
/// tick. Unknown transformation families are rejected here so they never
/// reach dispatch.
pub async fn create_task(
    State(state): State<AppState>,
    payload: Result<Json<Envelope<CreateTaskData>>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(Envelope { metadata, data }) = payload?;

    let party_id = non_empty(metadata.party_id).ok_or_else(|| {
        AppError::Core(CoreError::Validation("metadata.party_id is required".into()))
    })?;
    let family: Family = non_empty(data.transformation)
        .ok_or_else(|| {
            AppError::Core(CoreError::Validation(
                "data.transformation is required".into(),
            ))
        })?
        .parse()?;

    let name = match family {
        Family::Filter => data.filter_name,
        Family::Effect => data.direction,
    };
    let transformation = Transformation::from_parts(
        family.as_str(),
        data.type_id.as_deref().unwrap_or_default(),
        name.as_deref().unwrap_or_default(),
    )?;

    let record = state
        .store
        .create(&party_id, transformation, non_empty(data.image))
        .await;

    tracing::info!(
        key = %record.key,
        family = %family,
        "Task created",
    );

    let data = ActionData {
        task_id: Some(record.key.task_id.clone()),
        ..ActionData::ok().with_status(record.status)
    };
    Ok(Json(envelope(Metadata::from(&record.key), data)))
}

// ---------------------------------------------------------------------------
// Poll
// ---------------------------------------------------------------------------

/// GET /api/v1/actions?party_id=&task_id=
///
/// Report a task's status. The HTTP status encodes it: 200 in progress,
/// 201 done (with the image), 400 error (with a message), 204 deleted.
/// The 204 response carries no body, so no envelope either.
pub async fn poll_task(
    State(state): State<AppState>,
    query: Result<Query<TaskQuery>, QueryRejection>,
) -> AppResult<Response> {
    let Query(query) = query?;
    let metadata = query.metadata();
    let key = require_key(&metadata)?;

    let record = state
        .store
        .get(&key)
        .await
        .ok_or_else(|| AppError::Core(CoreError::NotFound(key.clone())))?;

    let response = match record.status {
        TaskStatus::InProgress => {
            let data = ActionData::ok().with_status(record.status);
            (StatusCode::OK, Json(envelope(metadata, data))).into_response()
        }
        TaskStatus::Done => {
            let image = state.store.image(&key).await.ok_or_else(|| {
                AppError::InternalError(format!("Task {key} is done but has no stored image"))
            })?;
            let data = ActionData {
                image: Some(image),
                ..ActionData::ok().with_status(record.status)
            };
            (StatusCode::CREATED, Json(envelope(metadata, data))).into_response()
        }
        TaskStatus::Error => {
            let data = ActionData {
                success: false,
                status: Some(record.status),
                errormessage: Some(
                    record
                        .error_message
                        .unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string()),
                ),
                code: record.error_code,
                ..ActionData::default()
            };
            (StatusCode::BAD_REQUEST, Json(envelope(metadata, data))).into_response()
        }
        TaskStatus::Deleted => StatusCode::NO_CONTENT.into_response(),
    };

    Ok(response)
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

/// DELETE /api/v1/actions?party_id=&task_id=
///
/// Retire a task that has not finished. Returns 204, or 409 if the task is
/// already terminal. The owning worker is asked to drop its pending
/// callback; a callback that still arrives is ignored.
pub async fn delete_task(
    State(state): State<AppState>,
    query: Result<Query<TaskQuery>, QueryRejection>,
) -> AppResult<impl IntoResponse> {
    let Query(query) = query?;
    let key = require_key(&query.metadata())?;

    let family = state
        .store
        .get(&key)
        .await
        .map(|t| t.transformation.family())
        .ok_or_else(|| AppError::Core(CoreError::NotFound(key.clone())))?;

    if let Transition::Ignored(status) = state.store.mark_deleted(&key).await? {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Task is already {status} and cannot be deleted"
        ))));
    }

    if let Err(e) = state.worker_client.cancel(&key, family).await {
        tracing::warn!(
            %key,
            error = %e,
            "Failed to cancel worker callback (task already marked deleted)",
        );
    }

    tracing::info!(%key, "Task deleted");

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Worker callback
// ---------------------------------------------------------------------------

/// POST /api/v1/actions/callback
///
/// Result report from a worker. Success moves the task to `done` and stores
/// the image; failure moves it to `error`. Reports for tasks that are
/// already terminal are acknowledged and ignored.
pub async fn worker_callback(
    State(state): State<AppState>,
    payload: Result<Json<Envelope<CallbackData>>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(Envelope { metadata, data }) = payload?;
    let key = require_key(&metadata)?;

    let transition = if data.success {
        let image = non_empty(data.image).ok_or_else(|| {
            AppError::Core(CoreError::Validation(
                "data.image is required when success is true".into(),
            ))
        })?;
        state.store.complete(&key, image).await?
    } else {
        let code = data.code.as_deref().unwrap_or(DEFAULT_ERROR_CODE);
        let message = data.message.as_deref().unwrap_or(DEFAULT_ERROR_MESSAGE);
        state.store.fail(&key, code, message).await?
    };

    tracing::info!(
        %key,
        applied = transition.was_applied(),
        status = %transition.status(),
        "Worker callback handled",
    );

    Ok(Json(envelope(metadata, ActionData::ok())))
}
