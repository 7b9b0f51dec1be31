pub mod actions;
pub mod health;

use axum::Router;

use crate::state::WorkerState;

/// Build the `/api/v1` route tree.
pub fn api_routes() -> Router<WorkerState> {
    Router::new().nest("/actions", actions::router())
}
