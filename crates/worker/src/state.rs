use std::sync::Arc;

use crate::callback::CallbackScheduler;
use crate::config::WorkerConfig;

/// Shared worker state available to all Axum handlers via `State<WorkerState>`.
#[derive(Clone)]
pub struct WorkerState {
    pub config: Arc<WorkerConfig>,
    /// Deferred callbacks, the only state shared between requests.
    pub callbacks: Arc<CallbackScheduler>,
}
