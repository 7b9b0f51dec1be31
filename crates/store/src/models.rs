//! Task records and the values returned by store operations.

use imgflow_core::task::{TaskStatus, Transformation};
use imgflow_core::types::{TaskKey, Timestamp};
use serde::Serialize;

/// A task as held by the store.
#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub key: TaskKey,
    pub transformation: Transformation,
    /// Image submitted by the client, if any. Never changes after creation.
    pub source_image: Option<String>,
    pub status: TaskStatus,
    pub created_at: Timestamp,
    /// Set once, when the dispatcher claims the task.
    pub dispatched_at: Option<Timestamp>,
    /// Set on the transition into any terminal status.
    pub completed_at: Option<Timestamp>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

/// Everything the worker client needs for one dispatch call.
#[derive(Debug, Clone)]
pub struct DispatchRecord {
    pub key: TaskKey,
    pub transformation: Transformation,
    /// `None` means the dispatcher substitutes its reference image.
    pub image: Option<String>,
}

/// Outcome of a state-machine operation on an existing task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The task moved into the contained status.
    Applied(TaskStatus),
    /// The task was already terminal; it keeps the contained status.
    Ignored(TaskStatus),
}

impl Transition {
    pub fn status(self) -> TaskStatus {
        match self {
            Transition::Applied(s) | Transition::Ignored(s) => s,
        }
    }

    pub fn was_applied(self) -> bool {
        matches!(self, Transition::Applied(_))
    }
}

/// Number of tasks per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub in_progress: usize,
    pub done: usize,
    pub error: usize,
    pub deleted: usize,
}
