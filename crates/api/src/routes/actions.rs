//! Route definitions for the `/actions` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::actions;
use crate::state::AppState;

/// Routes mounted at `/actions`.
///
/// ```text
/// GET    /?party_id=&task_id=   -> poll_task
/// POST   /                      -> create_task
/// DELETE /?party_id=&task_id=   -> delete_task
/// POST   /callback              -> worker_callback
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(actions::poll_task)
                .post(actions::create_task)
                .delete(actions::delete_task),
        )
        .route("/callback", post(actions::worker_callback))
}
