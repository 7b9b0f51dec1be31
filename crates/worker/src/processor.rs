//! Request validation and the image transformation step.
//!
//! [`process_task`] runs the checks in a fixed order (fields, image
//! presence, encoding, size) and stops at the first failure, then applies
//! the placeholder transform.

use std::fmt;
use std::str::FromStr;

use imgflow_core::envelope::Envelope;
use imgflow_core::image;
use imgflow_core::task::Family;
use imgflow_core::types::TaskKey;
use serde::{Deserialize, Serialize};

use crate::error::WorkerError;

/// `data` block of a processing request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProcessData {
    #[serde(rename = "Image")]
    pub image: Option<String>,
    pub transformation: Option<String>,
    pub type_id: Option<String>,
    pub filter_name: Option<String>,
    pub direction: Option<String>,
}

/// `data` block of a successful processing response.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedData {
    pub success: bool,
    #[serde(rename = "Image")]
    pub image: String,
}

/// Flip axis for the effect family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Horizontal,
    Vertical,
}

impl FromStr for Direction {
    type Err = WorkerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "horizontal" => Ok(Direction::Horizontal),
            "vertical" => Ok(Direction::Vertical),
            _ => Err(WorkerError::Validation(
                "\"data.direction\" must be one of [horizontal, vertical]".into(),
            )),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Horizontal => f.write_str("horizontal"),
            Direction::Vertical => f.write_str("vertical"),
        }
    }
}

/// Family-specific parameters after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkParams {
    Filter { filter_name: String },
    Effect { direction: Direction },
}

/// A fully validated task, ready to transform.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub key: TaskKey,
    pub type_id: String,
    pub params: WorkParams,
    pub image: String,
}

/// Output of a successful run.
#[derive(Debug, Clone)]
pub struct ProcessedTask {
    pub key: TaskKey,
    pub image: String,
}

fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, WorkerError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        Some(_) => Err(WorkerError::Validation(format!(
            "\"{field}\" is not allowed to be empty"
        ))),
        None => Err(WorkerError::Validation(format!("\"{field}\" is required"))),
    }
}

/// Check the request fields for a worker of `family`.
///
/// The image is only checked for presence here; encoding and size are
/// checked by [`process_task`].
pub fn validate_request(
    family: Family,
    request: &Envelope<ProcessData>,
) -> Result<WorkItem, WorkerError> {
    let metadata = &request.metadata;
    let data = &request.data;

    let party_id = required(metadata.party_id.as_deref(), "metadata.party_id")?;
    let task_id = required(metadata.task_id.as_deref(), "metadata.task_id")?;

    let transformation = required(data.transformation.as_deref(), "data.transformation")?;
    if transformation != family.as_str() {
        return Err(WorkerError::Validation(format!(
            "\"data.transformation\" must be [{family}]"
        )));
    }

    let type_id = required(data.type_id.as_deref(), "data.type_id")?;

    let params = match family {
        Family::Filter => WorkParams::Filter {
            filter_name: required(data.filter_name.as_deref(), "data.filter_name")?.to_string(),
        },
        Family::Effect => WorkParams::Effect {
            direction: required(data.direction.as_deref(), "data.direction")?.parse()?,
        },
    };

    let image = match data.image.as_deref() {
        Some(img) if !img.is_empty() => img.to_string(),
        _ => return Err(WorkerError::NoImage),
    };

    Ok(WorkItem {
        key: TaskKey::new(party_id, task_id),
        type_id: type_id.to_string(),
        params,
        image,
    })
}

/// Validate, check the image payload, and transform.
pub fn process_task(
    family: Family,
    max_image_bytes: usize,
    request: &Envelope<ProcessData>,
) -> Result<ProcessedTask, WorkerError> {
    let item = validate_request(family, request)?;
    let size = image::validate(&item.image, max_image_bytes)?;

    tracing::debug!(key = %item.key, type_id = %item.type_id, size, "Image payload accepted");

    let image = apply_transformation(&item);
    Ok(ProcessedTask {
        key: item.key,
        image,
    })
}

/// Apply the requested filter or effect.
///
/// Placeholder: no image algorithm is implemented, the input comes back
/// unchanged.
pub fn apply_transformation(item: &WorkItem) -> String {
    match &item.params {
        WorkParams::Filter { filter_name } => {
            tracing::info!(key = %item.key, %filter_name, "Applying filter");
        }
        WorkParams::Effect { direction } => {
            tracing::info!(key = %item.key, %direction, "Applying effect");
        }
    }
    image::passthrough(&item.image)
}
