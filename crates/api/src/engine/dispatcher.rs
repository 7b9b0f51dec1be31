//! Background task dispatcher.
//!
//! Every `poll_interval` it fails tasks whose dispatch deadline has passed,
//! then claims all undispatched `inProgress` tasks through
//! [`TaskStore::claim_undispatched`] and hands each to the [`WorkerClient`].
//! The claim stamps `dispatched_at`, so a task is sent at most once.
//!
//! Dispatch calls run on a [`TaskTracker`]; a tick never waits for a worker.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use imgflow_store::{DispatchRecord, TaskStore, Transition};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::worker_client::WorkerClient;

/// Default polling interval for the dispatcher loop.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Default time a dispatched task may wait for its worker callback.
const DEFAULT_DISPATCH_DEADLINE: Duration = Duration::from_secs(60);

/// What one dispatch cycle did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Tasks handed to the worker client.
    pub dispatched: usize,
    /// Tasks failed because their dispatch deadline passed.
    pub expired: usize,
}

/// Background task dispatcher.
///
/// A single long-lived Tokio task that matches `inProgress` tasks with the
/// worker owning their transformation family.
pub struct TaskDispatcher {
    store: Arc<TaskStore>,
    client: Arc<dyn WorkerClient>,
    reference_image: Arc<str>,
    poll_interval: Duration,
    dispatch_deadline: Duration,
    in_flight: TaskTracker,
}

impl TaskDispatcher {
    /// Create a dispatcher with the default 3-second poll interval and
    /// 60-second dispatch deadline.
    pub fn new(
        store: Arc<TaskStore>,
        client: Arc<dyn WorkerClient>,
        reference_image: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            store,
            client,
            reference_image: reference_image.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            dispatch_deadline: DEFAULT_DISPATCH_DEADLINE,
            in_flight: TaskTracker::new(),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_dispatch_deadline(mut self, dispatch_deadline: Duration) -> Self {
        self.dispatch_deadline = dispatch_deadline;
        self
    }

    /// Run the dispatcher loop until the cancellation token is triggered.
    ///
    /// In-flight dispatch calls are awaited before returning.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        tracing::info!(
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            dispatch_deadline_secs = self.dispatch_deadline.as_secs(),
            "Task dispatcher started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Task dispatcher shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    let report = self.run_cycle().await;
                    if report != CycleReport::default() {
                        tracing::debug!(
                            dispatched = report.dispatched,
                            expired = report.expired,
                            "Dispatch cycle finished",
                        );
                    }
                }
            }
        }

        self.drain().await;
    }

    /// One dispatch cycle: expire overdue tasks, then dispatch every
    /// undispatched task.
    pub async fn run_cycle(&self) -> CycleReport {
        let now = Utc::now();

        let cutoff = chrono::Duration::from_std(self.dispatch_deadline)
            .ok()
            .and_then(|deadline| now.checked_sub_signed(deadline));
        let expired = match cutoff {
            Some(cutoff) => self.store.expire_overdue(cutoff).await,
            None => Vec::new(),
        };
        for key in &expired {
            tracing::warn!(%key, "Task exceeded its dispatch deadline, marked as error");
        }

        let claimed = self.store.claim_undispatched(now).await;
        let dispatched = claimed.len();

        for record in claimed {
            let store = Arc::clone(&self.store);
            let client = Arc::clone(&self.client);
            let image = record
                .image
                .clone()
                .unwrap_or_else(|| self.reference_image.to_string());

            self.in_flight.spawn(async move {
                dispatch_one(&store, client.as_ref(), &record, &image).await;
            });
        }

        CycleReport {
            dispatched,
            expired: expired.len(),
        }
    }

    /// Wait for every dispatch call started so far to finish.
    pub async fn drain(&self) {
        self.in_flight.close();
        self.in_flight.wait().await;
        self.in_flight.reopen();
    }
}

/// Send one task and record a synchronous rejection as a failure.
///
/// Transport errors and worker faults leave the task `inProgress`; either a
/// late callback or the dispatch deadline settles it.
async fn dispatch_one(
    store: &TaskStore,
    client: &dyn WorkerClient,
    record: &DispatchRecord,
    image: &str,
) {
    let err = match client.dispatch(record, image).await {
        Ok(ack) => {
            tracing::info!(
                key = %record.key,
                family = %ack.family,
                status = ack.status,
                "Task accepted by worker",
            );
            return;
        }
        Err(e) => e,
    };

    let Some((code, message)) = err.task_rejection() else {
        tracing::error!(
            key = %record.key,
            error = %err,
            "Failed to dispatch task, waiting for callback or deadline",
        );
        return;
    };

    tracing::warn!(key = %record.key, error = %err, "Worker rejected task");
    match store.fail(&record.key, code, message).await {
        Ok(Transition::Applied(_)) => {}
        Ok(Transition::Ignored(status)) => {
            tracing::debug!(key = %record.key, %status, "Rejected task already terminal");
        }
        Err(e) => {
            tracing::error!(key = %record.key, error = %e, "Failed to record rejection");
        }
    }
}
