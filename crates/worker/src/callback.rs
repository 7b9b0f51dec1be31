//! Deferred result reports to the orchestrator.
//!
//! [`CallbackScheduler::schedule`] registers one cancellable delayed send per
//! task. The send happens on its own Tokio task after the configured delay,
//! independent of the request that scheduled it; [`CallbackScheduler::cancel`]
//! suppresses it if it has not fired yet.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use imgflow_core::envelope::{Envelope, Metadata};
use imgflow_core::types::TaskKey;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// `data` block of a callback sent to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallbackReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CallbackReport {
    pub fn completed(image: String) -> Self {
        Self {
            success: true,
            image: Some(image),
            code: None,
            message: None,
        }
    }

    pub fn failed(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            image: None,
            code: Some(code.into()),
            message: Some(message.into()),
        }
    }
}

/// Errors from delivering a callback.
#[derive(Debug, thiserror::Error)]
pub enum CallbackError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The orchestrator returned a non-2xx status code.
    #[error("Orchestrator rejected callback ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Destination of callbacks.
#[async_trait]
pub trait CallbackSink: Send + Sync {
    async fn send(&self, key: &TaskKey, report: &CallbackReport) -> Result<(), CallbackError>;
}

/// [`CallbackSink`] posting to the orchestrator's callback endpoint.
pub struct HttpCallbackSink {
    client: reqwest::Client,
    callback_url: String,
}

impl HttpCallbackSink {
    pub fn new(callback_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            callback_url,
        }
    }
}

#[async_trait]
impl CallbackSink for HttpCallbackSink {
    async fn send(&self, key: &TaskKey, report: &CallbackReport) -> Result<(), CallbackError> {
        let body = Envelope::new(Metadata::from(key), report);

        let response = self
            .client
            .post(&self.callback_url)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(CallbackError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

/// A registered, not yet fired callback.
struct PendingCallback {
    /// Distinguishes a re-scheduled callback from the one it replaced.
    generation: u64,
    cancel: CancellationToken,
}

type PendingMap = Arc<Mutex<HashMap<TaskKey, PendingCallback>>>;

/// Schedules delayed, cancellable callbacks.
///
/// Designed to be wrapped in `Arc` and shared across handlers.
pub struct CallbackScheduler {
    sink: Arc<dyn CallbackSink>,
    delay: Duration,
    pending: PendingMap,
    next_generation: AtomicU64,
    in_flight: TaskTracker,
}

impl CallbackScheduler {
    pub fn new(sink: Arc<dyn CallbackSink>, delay: Duration) -> Self {
        Self {
            sink,
            delay,
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(0),
            in_flight: TaskTracker::new(),
        }
    }

    /// Send `report` for `key` after the configured delay.
    ///
    /// A callback already pending for the same key is cancelled and
    /// replaced.
    pub async fn schedule(&self, key: TaskKey, report: CallbackReport) {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();

        let replaced = self.pending.lock().await.insert(
            key.clone(),
            PendingCallback {
                generation,
                cancel: cancel.clone(),
            },
        );
        if let Some(previous) = replaced {
            previous.cancel.cancel();
            tracing::debug!(%key, "Replaced pending callback");
        }

        let sink = Arc::clone(&self.sink);
        let pending = Arc::clone(&self.pending);
        let delay = self.delay;

        self.in_flight.spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(%key, "Callback cancelled before delivery");
                    return;
                }
                _ = tokio::time::sleep(delay) => {}
            }

            {
                let mut pending = pending.lock().await;
                if pending.get(&key).is_some_and(|p| p.generation == generation) {
                    pending.remove(&key);
                }
            }

            match sink.send(&key, &report).await {
                Ok(()) => {
                    tracing::info!(%key, success = report.success, "Callback delivered");
                }
                Err(e) => {
                    tracing::error!(%key, error = %e, "Failed to deliver callback");
                }
            }
        });
    }

    /// Suppress the pending callback for `key`. Returns whether one was
    /// pending.
    pub async fn cancel(&self, key: &TaskKey) -> bool {
        match self.pending.lock().await.remove(key) {
            Some(entry) => {
                entry.cancel.cancel();
                true
            }
            None => false,
        }
    }

    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Wait for every scheduled callback to be delivered or cancelled.
    pub async fn drain(&self) {
        self.in_flight.close();
        self.in_flight.wait().await;
        self.in_flight.reopen();
    }
}
