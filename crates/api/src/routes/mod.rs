pub mod actions;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /actions              create, poll, delete
/// /actions/callback     worker result report
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/actions", actions::router())
}
