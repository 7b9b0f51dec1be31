use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use imgflow_core::envelope::Metadata;
use imgflow_core::image::ImageError;
use serde_json::json;

/// Failure outcomes of a processing request.
///
/// Each variant maps to a distinct HTTP status and error code. All but
/// [`WorkerError::Internal`] are also reported to the orchestrator through
/// the failure callback.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// A required field is missing or has the wrong value.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The request carries no image.
    #[error("No file uploaded.")]
    NoImage,

    /// The image is not a decodable data-URL.
    #[error("Invalid image encoding: {0}")]
    InvalidEncoding(String),

    /// The decoded image exceeds the configured limit.
    #[error("Image of {size} bytes exceeds the {max} byte limit")]
    PayloadTooLarge { size: usize, max: usize },

    /// Unexpected fault. Never reported as a task failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ImageError> for WorkerError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::Missing => WorkerError::NoImage,
            ImageError::InvalidEncoding(reason) => WorkerError::InvalidEncoding(reason),
            ImageError::TooLarge { size, max } => WorkerError::PayloadTooLarge { size, max },
        }
    }
}

impl WorkerError {
    pub fn status(&self) -> StatusCode {
        match self {
            WorkerError::Validation(_) | WorkerError::NoImage => StatusCode::BAD_REQUEST,
            WorkerError::InvalidEncoding(_) => StatusCode::UNPROCESSABLE_ENTITY,
            WorkerError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            WorkerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            WorkerError::Validation(_) => "VALIDATION_ERROR",
            WorkerError::NoImage => "NO_IMAGE_UPLOADED",
            WorkerError::InvalidEncoding(_) => "INVALID_BASE64",
            WorkerError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            WorkerError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to show to callers and end users.
    pub fn public_message(&self) -> String {
        match self {
            WorkerError::Validation(msg) => msg.clone(),
            WorkerError::NoImage => "No file uploaded.".to_string(),
            WorkerError::InvalidEncoding(_) => {
                "The base64 string provided is invalid or corrupted.".to_string()
            }
            WorkerError::PayloadTooLarge { max, .. } => format!(
                "The file is too large. Maximum allowed size is {}.",
                format_size(*max)
            ),
            WorkerError::Internal(_) => "An internal server error occurred.".to_string(),
        }
    }

    /// Whether this failure should drive the task to `error` on the
    /// orchestrator. Internal faults leave the task as it is.
    pub fn reports_task_failure(&self) -> bool {
        !matches!(self, WorkerError::Internal(_))
    }

    /// Build the error envelope, echoing the request metadata.
    pub fn into_response_with(self, metadata: Metadata) -> Response {
        if let WorkerError::Internal(msg) = &self {
            tracing::error!(error = %msg, "Internal worker error");
        }

        let body = json!({
            "metadata": metadata,
            "data": {
                "success": false,
                "code": self.code(),
                "message": self.public_message(),
            },
        });

        (self.status(), axum::Json(body)).into_response()
    }
}

impl IntoResponse for WorkerError {
    fn into_response(self) -> Response {
        self.into_response_with(Metadata::default())
    }
}

/// Render a byte count as whole MB when exact, bytes otherwise.
fn format_size(bytes: usize) -> String {
    const MIB: usize = 1024 * 1024;
    if bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else {
        format!("{bytes} bytes")
    }
}
