use std::time::Duration;

use imgflow_core::image::REFERENCE_IMAGE;

use crate::worker_client::WorkerEndpoints;

/// Orchestrator configuration loaded from environment variables.
///
/// All fields have defaults suitable for running the three services on one
/// machine. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Maximum accepted request body in bytes (default: 16 MiB).
    pub body_limit_bytes: usize,
    /// Base URLs of the filter and effect workers.
    pub workers: WorkerEndpoints,
    /// Dispatch loop period (default: 3 s).
    pub dispatch_interval: Duration,
    /// How long a dispatched task may wait for its callback before it is
    /// failed with `DISPATCH_TIMEOUT` (default: 60 s).
    pub dispatch_deadline: Duration,
    /// Image sent to workers for tasks submitted without one.
    pub reference_image: String,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                  |
    /// |--------------------------|--------------------------|
    /// | `HOST`                   | `0.0.0.0`                |
    /// | `PORT`                   | `3000`                   |
    /// | `CORS_ORIGINS`           | `http://localhost:5173`  |
    /// | `REQUEST_TIMEOUT_SECS`   | `30`                     |
    /// | `BODY_LIMIT_BYTES`       | `16777216`               |
    /// | `FILTER_WORKER_URL`      | `http://localhost:3001`  |
    /// | `EFFECT_WORKER_URL`      | `http://localhost:3002`  |
    /// | `DISPATCH_INTERVAL_MS`   | `3000`                   |
    /// | `DISPATCH_DEADLINE_SECS` | `60`                     |
    /// | `REFERENCE_IMAGE`        | built-in 1x1 PNG         |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let body_limit_bytes: usize = std::env::var("BODY_LIMIT_BYTES")
            .unwrap_or_else(|_| (16 * 1024 * 1024).to_string())
            .parse()
            .expect("BODY_LIMIT_BYTES must be a valid usize");

        let workers = WorkerEndpoints {
            filter_url: std::env::var("FILTER_WORKER_URL")
                .unwrap_or_else(|_| "http://localhost:3001".into()),
            effect_url: std::env::var("EFFECT_WORKER_URL")
                .unwrap_or_else(|_| "http://localhost:3002".into()),
        };

        let dispatch_interval_ms: u64 = std::env::var("DISPATCH_INTERVAL_MS")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("DISPATCH_INTERVAL_MS must be a valid u64");

        let dispatch_deadline_secs: u64 = std::env::var("DISPATCH_DEADLINE_SECS")
            .unwrap_or_else(|_| "60".into())
            .parse()
            .expect("DISPATCH_DEADLINE_SECS must be a valid u64");

        let reference_image =
            std::env::var("REFERENCE_IMAGE").unwrap_or_else(|_| REFERENCE_IMAGE.into());

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            body_limit_bytes,
            workers,
            dispatch_interval: Duration::from_millis(dispatch_interval_ms),
            dispatch_deadline: Duration::from_secs(dispatch_deadline_secs),
            reference_image,
        }
    }
}
