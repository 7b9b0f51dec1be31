//! The `{ "metadata": ..., "data": ... }` envelope used by every endpoint.

use serde::{Deserialize, Serialize};

use crate::types::TaskKey;

/// Identity block carried by every request and echoed in every response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub party_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

impl Metadata {
    /// Both identifiers, if present and non-empty.
    pub fn task_key(&self) -> Option<TaskKey> {
        match (self.party_id.as_deref(), self.task_id.as_deref()) {
            (Some(party), Some(task)) if !party.is_empty() && !task.is_empty() => {
                Some(TaskKey::new(party, task))
            }
            _ => None,
        }
    }
}

impl From<&TaskKey> for Metadata {
    fn from(key: &TaskKey) -> Self {
        Self {
            party_id: Some(key.party_id.clone()),
            task_id: Some(key.task_id.clone()),
        }
    }
}

/// Request and response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<D> {
    #[serde(default)]
    pub metadata: Metadata,
    pub data: D,
}

impl<D> Envelope<D> {
    pub fn new(metadata: Metadata, data: D) -> Self {
        Self { metadata, data }
    }
}
