//! Task status, transformation families, and transformation parameters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status of a task.
///
/// A task is created directly in `InProgress`; "pending" and "in progress"
/// are not observably different. `Done`, `Error`, and `Deleted` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskStatus {
    InProgress,
    Done,
    Error,
    Deleted,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TaskStatus::InProgress)
    }

    /// Wire name, identical to the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::InProgress => "inProgress",
            TaskStatus::Done => "done",
            TaskStatus::Error => "error",
            TaskStatus::Deleted => "deleted",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Family
// ---------------------------------------------------------------------------

/// Transformation family; decides which worker owns a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    Filter,
    Effect,
}

impl Family {
    pub fn as_str(self) -> &'static str {
        match self {
            Family::Filter => "filter",
            Family::Effect => "effect",
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Family {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "filter" => Ok(Family::Filter),
            "effect" => Ok(Family::Effect),
            other => Err(CoreError::UnsupportedTransformation(format!(
                "\"{other}\" is not a known transformation family (expected \"filter\" or \"effect\")"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Transformation
// ---------------------------------------------------------------------------

/// Family-specific parameters of a task, fixed at creation.
///
/// The effect `direction` is kept as the raw string the client sent. The
/// effect worker is the authority on which directions exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "transformation", rename_all = "lowercase")]
pub enum Transformation {
    Filter { type_id: String, filter_name: String },
    Effect { type_id: String, direction: String },
}

impl Transformation {
    /// Build a transformation from the loosely-typed request fields.
    ///
    /// `name` is the filter name for `filter` and the direction for `effect`.
    pub fn from_parts(family: &str, type_id: &str, name: &str) -> Result<Self, CoreError> {
        let family: Family = family.parse()?;

        if type_id.trim().is_empty() {
            return Err(CoreError::Validation("type_id must not be empty".into()));
        }

        let param = match family {
            Family::Filter => "filter_name",
            Family::Effect => "direction",
        };
        if name.trim().is_empty() {
            return Err(CoreError::Validation(format!(
                "{param} is required for the \"{family}\" transformation"
            )));
        }

        Ok(match family {
            Family::Filter => Transformation::Filter {
                type_id: type_id.to_string(),
                filter_name: name.to_string(),
            },
            Family::Effect => Transformation::Effect {
                type_id: type_id.to_string(),
                direction: name.to_string(),
            },
        })
    }

    pub fn family(&self) -> Family {
        match self {
            Transformation::Filter { .. } => Family::Filter,
            Transformation::Effect { .. } => Family::Effect,
        }
    }

    pub fn type_id(&self) -> &str {
        match self {
            Transformation::Filter { type_id, .. } | Transformation::Effect { type_id, .. } => {
                type_id
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
