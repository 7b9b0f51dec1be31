use std::time::Duration;

use imgflow_core::image::DEFAULT_MAX_IMAGE_BYTES;
use imgflow_core::task::Family;

/// Worker configuration loaded from environment variables.
///
/// One binary serves either family; `WORKER_FAMILY` picks which.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Transformation family this worker accepts.
    pub family: Family,
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3001` for filter, `3002` for effect).
    pub port: u16,
    /// Base URL of the orchestrator receiving callbacks.
    pub orchestrator_url: String,
    /// Delay between the synchronous response and the callback (default: 1 s).
    pub callback_delay: Duration,
    /// Largest accepted decoded image (default: 5 MiB).
    pub max_image_bytes: usize,
    /// Maximum accepted request body (default: 16 MiB).
    pub body_limit_bytes: usize,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                  |
    /// |------------------------|--------------------------|
    /// | `WORKER_FAMILY`        | `filter`                 |
    /// | `HOST`                 | `0.0.0.0`                |
    /// | `PORT`                 | `3001` / `3002`          |
    /// | `ORCHESTRATOR_URL`     | `http://localhost:3000`  |
    /// | `CALLBACK_DELAY_MS`    | `1000`                   |
    /// | `MAX_IMAGE_BYTES`      | `5242880`                |
    /// | `BODY_LIMIT_BYTES`     | `16777216`               |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                     |
    pub fn from_env() -> Self {
        let family: Family = std::env::var("WORKER_FAMILY")
            .unwrap_or_else(|_| "filter".into())
            .parse()
            .expect("WORKER_FAMILY must be \"filter\" or \"effect\"");

        let default_port = match family {
            Family::Filter => "3001",
            Family::Effect => "3002",
        };

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| default_port.into())
            .parse()
            .expect("PORT must be a valid u16");

        let orchestrator_url = std::env::var("ORCHESTRATOR_URL")
            .unwrap_or_else(|_| "http://localhost:3000".into());

        let callback_delay_ms: u64 = std::env::var("CALLBACK_DELAY_MS")
            .unwrap_or_else(|_| "1000".into())
            .parse()
            .expect("CALLBACK_DELAY_MS must be a valid u64");

        let max_image_bytes: usize = std::env::var("MAX_IMAGE_BYTES")
            .unwrap_or_else(|_| DEFAULT_MAX_IMAGE_BYTES.to_string())
            .parse()
            .expect("MAX_IMAGE_BYTES must be a valid usize");

        let body_limit_bytes: usize = std::env::var("BODY_LIMIT_BYTES")
            .unwrap_or_else(|_| (16 * 1024 * 1024).to_string())
            .parse()
            .expect("BODY_LIMIT_BYTES must be a valid usize");

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        Self {
            family,
            host,
            port,
            orchestrator_url,
            callback_delay: Duration::from_millis(callback_delay_ms),
            max_image_bytes,
            body_limit_bytes,
            request_timeout_secs,
        }
    }

    /// Full URL of the orchestrator's callback endpoint.
    pub fn callback_url(&self) -> String {
        format!(
            "{}/api/v1/actions/callback",
            self.orchestrator_url.trim_end_matches('/')
        )
    }
}
