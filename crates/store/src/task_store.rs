//! Task registry and lifecycle state machine.
//!
//! ```text
//! create ──> inProgress ──complete──> done
//!                 │ ──────fail──────> error
//!                 │ ──expire_overdue> error (DISPATCH_TIMEOUT)
//!                 └──mark_deleted───> deleted
//! ```
//!
//! Terminal statuses are final. Operations on a terminal task return
//! [`Transition::Ignored`] instead of failing, so repeated and late worker
//! callbacks are harmless.

use std::collections::HashMap;

use chrono::Utc;
use imgflow_core::error::CoreError;
use imgflow_core::task::{TaskStatus, Transformation};
use imgflow_core::types::{TaskKey, Timestamp};
use tokio::sync::RwLock;

use crate::image_store::ImageStore;
use crate::models::{DispatchRecord, StatusCounts, TaskRecord, Transition};

/// Error code recorded when a dispatched task never reports back.
pub const DISPATCH_TIMEOUT_CODE: &str = "DISPATCH_TIMEOUT";

/// Message recorded when a dispatched task never reports back.
pub const DISPATCH_TIMEOUT_MESSAGE: &str =
    "The worker did not report a result before the dispatch deadline";

/// Shared task store.
///
/// One lock covers both tasks and images.
#[derive(Debug, Default)]
pub struct TaskStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    tasks: HashMap<TaskKey, TaskRecord>,
    images: ImageStore,
}

impl Inner {
    fn existing_mut(&mut self, key: &TaskKey) -> Result<&mut TaskRecord, CoreError> {
        self.tasks
            .get_mut(key)
            .ok_or_else(|| CoreError::NotFound(key.clone()))
    }
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new task in `inProgress` under a freshly generated id.
    pub async fn create(
        &self,
        party_id: &str,
        transformation: Transformation,
        source_image: Option<String>,
    ) -> TaskRecord {
        let mut inner = self.inner.write().await;

        let key = loop {
            let candidate = TaskKey::new(party_id, uuid::Uuid::new_v4().to_string());
            if !inner.tasks.contains_key(&candidate) {
                break candidate;
            }
            tracing::warn!(%candidate, "Generated task id already in use, regenerating");
        };

        let record = TaskRecord {
            key: key.clone(),
            transformation,
            source_image,
            status: TaskStatus::InProgress,
            created_at: Utc::now(),
            dispatched_at: None,
            completed_at: None,
            error_code: None,
            error_message: None,
        };
        inner.tasks.insert(key, record.clone());
        record
    }

    pub async fn get(&self, key: &TaskKey) -> Option<TaskRecord> {
        self.inner.read().await.tasks.get(key).cloned()
    }

    /// Result image of a `done` task.
    pub async fn image(&self, key: &TaskKey) -> Option<String> {
        self.inner.read().await.images.get(key).map(str::to_string)
    }

    /// `inProgress -> done`, storing the result image.
    pub async fn complete(&self, key: &TaskKey, image: String) -> Result<Transition, CoreError> {
        let mut inner = self.inner.write().await;
        let task = inner.existing_mut(key)?;

        if task.status.is_terminal() {
            return Ok(Transition::Ignored(task.status));
        }
        task.status = TaskStatus::Done;
        task.completed_at = Some(Utc::now());

        inner.images.insert(key.clone(), image);
        Ok(Transition::Applied(TaskStatus::Done))
    }

    /// `inProgress -> error`. No image is stored.
    pub async fn fail(
        &self,
        key: &TaskKey,
        code: &str,
        message: &str,
    ) -> Result<Transition, CoreError> {
        let mut inner = self.inner.write().await;
        let task = inner.existing_mut(key)?;

        if task.status.is_terminal() {
            return Ok(Transition::Ignored(task.status));
        }
        task.status = TaskStatus::Error;
        task.completed_at = Some(Utc::now());
        task.error_code = Some(code.to_string());
        task.error_message = Some(message.to_string());
        Ok(Transition::Applied(TaskStatus::Error))
    }

    /// Any non-terminal status `-> deleted`.
    pub async fn mark_deleted(&self, key: &TaskKey) -> Result<Transition, CoreError> {
        let mut inner = self.inner.write().await;
        let task = inner.existing_mut(key)?;

        if task.status.is_terminal() {
            return Ok(Transition::Ignored(task.status));
        }
        task.status = TaskStatus::Deleted;
        task.completed_at = Some(Utc::now());
        Ok(Transition::Applied(TaskStatus::Deleted))
    }

    /// Stamp every `inProgress` task that has not been dispatched yet with
    /// `now` and return them for dispatch.
    ///
    /// A task is returned by at most one call over its lifetime.
    pub async fn claim_undispatched(&self, now: Timestamp) -> Vec<DispatchRecord> {
        let mut inner = self.inner.write().await;

        let mut claimed: Vec<DispatchRecord> = inner
            .tasks
            .values_mut()
            .filter(|t| t.status == TaskStatus::InProgress && t.dispatched_at.is_none())
            .map(|t| {
                t.dispatched_at = Some(now);
                DispatchRecord {
                    key: t.key.clone(),
                    transformation: t.transformation.clone(),
                    image: t.source_image.clone(),
                }
            })
            .collect();

        // Oldest first; HashMap iteration order is arbitrary.
        claimed.sort_by_key(|r| inner.tasks.get(&r.key).map(|t| t.created_at));
        claimed
    }

    /// Fail every dispatched `inProgress` task whose dispatch happened
    /// before `cutoff`. Returns the keys that expired.
    pub async fn expire_overdue(&self, cutoff: Timestamp) -> Vec<TaskKey> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();

        inner
            .tasks
            .values_mut()
            .filter(|t| {
                t.status == TaskStatus::InProgress
                    && t.dispatched_at.is_some_and(|at| at < cutoff)
            })
            .map(|t| {
                t.status = TaskStatus::Error;
                t.completed_at = Some(now);
                t.error_code = Some(DISPATCH_TIMEOUT_CODE.to_string());
                t.error_message = Some(DISPATCH_TIMEOUT_MESSAGE.to_string());
                t.key.clone()
            })
            .collect()
    }

    pub async fn counts(&self) -> StatusCounts {
        let inner = self.inner.read().await;
        inner
            .tasks
            .values()
            .fold(StatusCounts::default(), |mut acc, t| {
                match t.status {
                    TaskStatus::InProgress => acc.in_progress += 1,
                    TaskStatus::Done => acc.done += 1,
                    TaskStatus::Error => acc.error += 1,
                    TaskStatus::Deleted => acc.deleted += 1,
                }
                acc
            })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use assert_matches::assert_matches;
    use chrono::Duration;

    use super::*;

    fn sepia() -> Transformation {
        Transformation::from_parts("filter", "3", "Sepia").unwrap()
    }

    async fn store_with_task() -> (TaskStore, TaskKey) {
        let store = TaskStore::new();
        let record = store.create("P1", sepia(), None).await;
        (store, record.key)
    }

    // -- create ---------------------------------------------------------------

    #[tokio::test]
    async fn create_starts_in_progress_and_undispatched() {
        let (store, key) = store_with_task().await;
        let task = store.get(&key).await.unwrap();

        assert_eq!(task.key.party_id, "P1");
        assert_eq!(task.status, TaskStatus::InProgress);
        assert!(task.dispatched_at.is_none());
        assert!(store.image(&key).await.is_none());
    }

    #[tokio::test]
    async fn created_task_ids_are_unique() {
        let store = TaskStore::new();
        let mut ids = HashSet::new();
        for _ in 0..500 {
            let record = store.create("P1", sepia(), None).await;
            assert!(ids.insert(record.key.task_id));
        }
        assert_eq!(store.counts().await.in_progress, 500);
    }

    // -- complete -------------------------------------------------------------

    #[tokio::test]
    async fn complete_stores_image() {
        let (store, key) = store_with_task().await;

        let t = store.complete(&key, "img".into()).await.unwrap();

        assert_eq!(t, Transition::Applied(TaskStatus::Done));
        assert_eq!(store.get(&key).await.unwrap().status, TaskStatus::Done);
        assert_eq!(store.image(&key).await.as_deref(), Some("img"));
    }

    #[tokio::test]
    async fn repeated_complete_is_ignored_and_keeps_first_image() {
        let (store, key) = store_with_task().await;
        store.complete(&key, "first".into()).await.unwrap();

        let t = store.complete(&key, "second".into()).await.unwrap();

        assert_eq!(t, Transition::Ignored(TaskStatus::Done));
        assert_eq!(store.image(&key).await.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn complete_unknown_task_is_not_found() {
        let store = TaskStore::new();
        let key = TaskKey::new("P1", "missing");
        assert_matches!(
            store.complete(&key, "img".into()).await,
            Err(CoreError::NotFound(k)) if k == key
        );
    }

    // -- fail -----------------------------------------------------------------

    #[tokio::test]
    async fn fail_records_code_and_message_without_image() {
        let (store, key) = store_with_task().await;

        let t = store
            .fail(&key, "VALIDATION_ERROR", "bad direction")
            .await
            .unwrap();

        assert_eq!(t, Transition::Applied(TaskStatus::Error));
        let task = store.get(&key).await.unwrap();
        assert_eq!(task.error_code.as_deref(), Some("VALIDATION_ERROR"));
        assert_eq!(task.error_message.as_deref(), Some("bad direction"));
        assert!(store.image(&key).await.is_none());
    }

    // -- monotonicity ---------------------------------------------------------

    #[tokio::test]
    async fn terminal_statuses_never_change() {
        for terminal in [TaskStatus::Done, TaskStatus::Error, TaskStatus::Deleted] {
            let (store, key) = store_with_task().await;
            match terminal {
                TaskStatus::Done => store.complete(&key, "img".into()).await.unwrap(),
                TaskStatus::Error => store.fail(&key, "X", "x").await.unwrap(),
                _ => store.mark_deleted(&key).await.unwrap(),
            };

            store.complete(&key, "late".into()).await.unwrap();
            store.fail(&key, "Y", "y").await.unwrap();
            store.mark_deleted(&key).await.unwrap();
            assert!(store.claim_undispatched(Utc::now()).await.is_empty());
            store.expire_overdue(Utc::now() + Duration::days(1)).await;

            assert_eq!(store.get(&key).await.unwrap().status, terminal);
        }
    }

    #[tokio::test]
    async fn late_completion_after_delete_stores_no_image() {
        let (store, key) = store_with_task().await;
        store.mark_deleted(&key).await.unwrap();

        let t = store.complete(&key, "late".into()).await.unwrap();

        assert_eq!(t, Transition::Ignored(TaskStatus::Deleted));
        assert!(store.image(&key).await.is_none());
    }

    // -- dispatch bookkeeping -------------------------------------------------

    #[tokio::test]
    async fn claim_returns_every_undispatched_task_once() {
        let store = TaskStore::new();
        for _ in 0..3 {
            store.create("P1", sepia(), None).await;
        }

        let first = store.claim_undispatched(Utc::now()).await;
        let second = store.claim_undispatched(Utc::now()).await;

        assert_eq!(first.len(), 3);
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn claim_carries_transformation_and_source_image() {
        let store = TaskStore::new();
        let record = store.create("P1", sepia(), Some("src".into())).await;

        let claimed = store.claim_undispatched(Utc::now()).await;

        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].key, record.key);
        assert_eq!(claimed[0].transformation, sepia());
        assert_eq!(claimed[0].image.as_deref(), Some("src"));
    }

    #[tokio::test]
    async fn expire_only_hits_tasks_dispatched_before_cutoff() {
        let store = TaskStore::new();
        let old = store.create("P1", sepia(), None).await.key;
        let dispatched_at = Utc::now() - Duration::seconds(120);
        store.claim_undispatched(dispatched_at).await;
        let fresh = store.create("P1", sepia(), None).await.key;

        let expired = store
            .expire_overdue(Utc::now() - Duration::seconds(60))
            .await;

        assert_eq!(expired, vec![old.clone()]);
        let task = store.get(&old).await.unwrap();
        assert_eq!(task.status, TaskStatus::Error);
        assert_eq!(task.error_code.as_deref(), Some(DISPATCH_TIMEOUT_CODE));
        assert_eq!(
            store.get(&fresh).await.unwrap().status,
            TaskStatus::InProgress
        );
    }

    #[tokio::test]
    async fn counts_tally_each_status() {
        let store = TaskStore::new();
        let a = store.create("P1", sepia(), None).await.key;
        let b = store.create("P1", sepia(), None).await.key;
        let c = store.create("P2", sepia(), None).await.key;
        store.create("P2", sepia(), None).await;

        store.complete(&a, "img".into()).await.unwrap();
        store.fail(&b, "X", "x").await.unwrap();
        store.mark_deleted(&c).await.unwrap();

        assert_eq!(
            store.counts().await,
            StatusCounts {
                in_progress: 1,
                done: 1,
                error: 1,
                deleted: 1,
            }
        );
    }
}
