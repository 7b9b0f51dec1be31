//! Outbound calls from the orchestrator to the worker services.
//!
//! [`route`] decides which worker owns a task and builds the request body;
//! [`HttpWorkerClient`] sends it with [`reqwest`]. The dispatcher only sees
//! the [`WorkerClient`] trait so tests can substitute a fake.

use async_trait::async_trait;
use imgflow_core::envelope::{Envelope, Metadata};
use imgflow_core::task::{Family, Transformation};
use imgflow_core::types::TaskKey;
use imgflow_store::DispatchRecord;
use serde_json::json;

/// Path of the processing endpoint on every worker.
pub const PROCESS_PATH: &str = "/api/v1/actions";

/// Path of the callback-cancellation endpoint on every worker.
pub const CANCEL_PATH: &str = "/api/v1/actions/cancel";

/// Base URLs of the two workers.
#[derive(Debug, Clone)]
pub struct WorkerEndpoints {
    pub filter_url: String,
    pub effect_url: String,
}

impl WorkerEndpoints {
    pub fn base_url(&self, family: Family) -> &str {
        match family {
            Family::Filter => &self.filter_url,
            Family::Effect => &self.effect_url,
        }
    }
}

/// Destination family and JSON body of one dispatch.
#[derive(Debug, Clone)]
pub struct WorkerRoute {
    pub family: Family,
    pub body: serde_json::Value,
}

/// Build the worker request for a task.
///
/// Every [`Transformation`] variant has an owner, so routing cannot fail;
/// unknown families are rejected when the task is created.
pub fn route(key: &TaskKey, transformation: &Transformation, image: &str) -> WorkerRoute {
    let data = match transformation {
        Transformation::Filter {
            type_id,
            filter_name,
        } => json!({
            "Image": image,
            "transformation": "filter",
            "type_id": type_id,
            "filter_name": filter_name,
        }),
        Transformation::Effect { type_id, direction } => json!({
            "Image": image,
            "transformation": "effect",
            "type_id": type_id,
            "direction": direction,
        }),
    };

    WorkerRoute {
        family: transformation.family(),
        body: json!(Envelope::new(Metadata::from(key), data)),
    }
}

/// Synchronous acknowledgement returned by a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchAck {
    pub family: Family,
    pub status: u16,
}

/// Errors from a dispatch or cancel call.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The HTTP request itself failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The worker answered with a non-2xx status.
    #[error("Worker rejected the request ({status}) {code}: {message}")]
    Rejected {
        status: u16,
        code: String,
        message: String,
    },
}

impl DispatchError {
    /// Code and message when the worker refused the task itself (4xx), as
    /// opposed to a transport failure or a worker-side fault.
    pub fn task_rejection(&self) -> Option<(&str, &str)> {
        match self {
            DispatchError::Rejected {
                status,
                code,
                message,
            } if (400..500).contains(status) => Some((code, message)),
            _ => None,
        }
    }
}

/// Hands tasks to the worker owning their transformation family.
#[async_trait]
pub trait WorkerClient: Send + Sync {
    /// Send one task to its worker with the given image payload.
    async fn dispatch(
        &self,
        record: &DispatchRecord,
        image: &str,
    ) -> Result<DispatchAck, DispatchError>;

    /// Ask the worker owning `family` to drop its pending callback for `key`.
    async fn cancel(&self, key: &TaskKey, family: Family) -> Result<(), DispatchError>;
}

/// [`WorkerClient`] speaking HTTP to the worker services.
pub struct HttpWorkerClient {
    client: reqwest::Client,
    endpoints: WorkerEndpoints,
}

impl HttpWorkerClient {
    pub fn new(endpoints: WorkerEndpoints) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoints,
        }
    }

    /// Turn a non-2xx response into [`DispatchError::Rejected`], reading the
    /// worker's `data.code` / `data.message` when present.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, DispatchError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body: serde_json::Value = response.json().await.unwrap_or_default();
        let field = |name: &str| {
            body["data"][name]
                .as_str()
                .map(str::to_string)
        };

        Err(DispatchError::Rejected {
            status: status.as_u16(),
            code: field("code").unwrap_or_else(|| "WORKER_ERROR".to_string()),
            message: field("message")
                .or_else(|| field("errormessage"))
                .unwrap_or_else(|| status.to_string()),
        })
    }
}

#[async_trait]
impl WorkerClient for HttpWorkerClient {
    async fn dispatch(
        &self,
        record: &DispatchRecord,
        image: &str,
    ) -> Result<DispatchAck, DispatchError> {
        let route = route(&record.key, &record.transformation, image);
        let url = format!("{}{PROCESS_PATH}", self.endpoints.base_url(route.family));

        tracing::debug!(key = %record.key, family = %route.family, %url, "Dispatching task");

        let response = self.client.post(url).json(&route.body).send().await?;
        let response = Self::ensure_success(response).await?;

        Ok(DispatchAck {
            family: route.family,
            status: response.status().as_u16(),
        })
    }

    async fn cancel(&self, key: &TaskKey, family: Family) -> Result<(), DispatchError> {
        let url = format!("{}{CANCEL_PATH}", self.endpoints.base_url(family));
        let body = json!({ "metadata": Metadata::from(key) });

        let response = self.client.post(url).json(&body).send().await?;
        Self::ensure_success(response).await?;
        Ok(())
    }
}
