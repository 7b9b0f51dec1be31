//! In-memory task and result-image storage.
//!
//! [`TaskStore`] is the single source of truth for task status and owns the
//! [`ImageStore`]. It is designed to be shared via `Arc<TaskStore>` between
//! request handlers and the dispatcher.

pub mod image_store;
pub mod models;
pub mod task_store;

pub use image_store::ImageStore;
pub use models::{DispatchRecord, StatusCounts, TaskRecord, Transition};
pub use task_store::TaskStore;
