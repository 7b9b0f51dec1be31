use crate::types::TaskKey;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Task not found: {0}")]
    NotFound(TaskKey),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unsupported transformation: {0}")]
    UnsupportedTransformation(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}
