//! Route definitions for the worker's `/actions` resource.

use axum::routing::post;
use axum::Router;

use crate::handlers::actions;
use crate::state::WorkerState;

/// Routes mounted at `/actions`.
///
/// ```text
/// POST   /          -> process_task
/// POST   /cancel    -> cancel_callback
/// ```
pub fn router() -> Router<WorkerState> {
    Router::new()
        .route("/", post(actions::process_task))
        .route("/cancel", post(actions::cancel_callback))
}
