//! Response payload types for the `/actions` endpoints.
//!
//! Every response is an [`Envelope`] whose `data` is an [`ActionData`].
//! Optional fields are omitted from the JSON when unset.

use imgflow_core::envelope::{Envelope, Metadata};
use imgflow_core::task::TaskStatus;
use serde::Serialize;

/// `data` block of every `/actions` response.
#[derive(Debug, Default, Serialize)]
pub struct ActionData {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errormessage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ActionData {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }
}

pub type ActionResponse = Envelope<ActionData>;

/// Shorthand for building an [`ActionResponse`].
pub fn envelope(metadata: Metadata, data: ActionData) -> ActionResponse {
    Envelope::new(metadata, data)
}
