use std::fmt;

use serde::{Deserialize, Serialize};

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Identity of a task: the party it was submitted for plus the task id.
///
/// Both parts are opaque strings. The pair is used as a map key directly,
/// so no delimiter is ever needed to combine them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskKey {
    pub party_id: String,
    pub task_id: String,
}

impl TaskKey {
    pub fn new(party_id: impl Into<String>, task_id: impl Into<String>) -> Self {
        Self {
            party_id: party_id.into(),
            task_id: task_id.into(),
        }
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "party={} task={}", self.party_id, self.task_id)
    }
}
