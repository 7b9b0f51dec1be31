use std::sync::Arc;

use imgflow_store::TaskStore;

use crate::worker_client::WorkerClient;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Task and result-image store, shared with the dispatcher.
    pub store: Arc<TaskStore>,
    /// Outbound worker calls (used here for callback cancellation).
    pub worker_client: Arc<dyn WorkerClient>,
}
