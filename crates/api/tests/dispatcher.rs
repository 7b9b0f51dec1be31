//! Tests for the background task dispatcher, driven against a fake worker
//! client.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{FakeOutcome, FakeWorkerClient};
use imgflow_api::engine::dispatcher::{CycleReport, TaskDispatcher};
use imgflow_core::image::REFERENCE_IMAGE;
use imgflow_core::task::{Family, TaskStatus, Transformation};
use imgflow_core::types::TaskKey;
use imgflow_store::task_store::DISPATCH_TIMEOUT_CODE;
use imgflow_store::TaskStore;
use tokio_util::sync::CancellationToken;

fn sepia() -> Transformation {
    Transformation::from_parts("filter", "3", "Sepia").unwrap()
}

fn flip(direction: &str) -> Transformation {
    Transformation::from_parts("effect", "1", direction).unwrap()
}

fn dispatcher(store: &Arc<TaskStore>, client: &Arc<FakeWorkerClient>) -> TaskDispatcher {
    TaskDispatcher::new(Arc::clone(store), client.clone(), REFERENCE_IMAGE)
}

#[tokio::test]
async fn cycle_dispatches_every_pending_task_once() {
    let store = Arc::new(TaskStore::new());
    let client = Arc::new(FakeWorkerClient::accepting());
    let dispatcher = dispatcher(&store, &client);

    store.create("P1", sepia(), None).await;
    store.create("P1", flip("vertical"), None).await;
    store.create("P2", sepia(), None).await;

    let report = dispatcher.run_cycle().await;
    dispatcher.drain().await;
    assert_eq!(
        report,
        CycleReport {
            dispatched: 3,
            expired: 0
        }
    );

    let report = dispatcher.run_cycle().await;
    dispatcher.drain().await;
    assert_eq!(report, CycleReport::default());

    let dispatched = client.dispatched.lock().await;
    assert_eq!(dispatched.len(), 3);
    assert_eq!(
        dispatched.iter().filter(|(_, f, _)| *f == Family::Effect).count(),
        1
    );
}

#[tokio::test]
async fn reference_image_is_sent_when_none_was_supplied() {
    let store = Arc::new(TaskStore::new());
    let client = Arc::new(FakeWorkerClient::accepting());
    let dispatcher = dispatcher(&store, &client);

    let custom = "data:image/png;base64,AQID";
    let without = store.create("P1", sepia(), None).await;
    let with = store.create("P1", sepia(), Some(custom.to_string())).await;

    dispatcher.run_cycle().await;
    dispatcher.drain().await;

    let dispatched = client.dispatched.lock().await;
    let image_for = |key: &TaskKey| {
        dispatched
            .iter()
            .find(|(k, _, _)| k == key)
            .map(|(_, _, image)| image.as_str())
    };
    assert_eq!(image_for(&without.key), Some(REFERENCE_IMAGE));
    assert_eq!(image_for(&with.key), Some(custom));
}

#[tokio::test]
async fn synchronous_rejection_fails_the_task() {
    let store = Arc::new(TaskStore::new());
    let client = Arc::new(FakeWorkerClient::new(FakeOutcome::Reject {
        status: 400,
        code: "VALIDATION_ERROR",
        message: "\"data.direction\" must be one of [horizontal, vertical]",
    }));
    let dispatcher = dispatcher(&store, &client);

    let task = store.create("P1", flip("diagonal"), None).await;
    dispatcher.run_cycle().await;
    dispatcher.drain().await;

    let record = store.get(&task.key).await.unwrap();
    assert_eq!(record.status, TaskStatus::Error);
    assert_eq!(record.error_code.as_deref(), Some("VALIDATION_ERROR"));
    assert!(record.error_message.unwrap().contains("horizontal"));
}

#[tokio::test]
async fn worker_fault_leaves_task_in_progress() {
    let store = Arc::new(TaskStore::new());
    let client = Arc::new(FakeWorkerClient::new(FakeOutcome::Reject {
        status: 503,
        code: "WORKER_ERROR",
        message: "unavailable",
    }));
    let dispatcher = dispatcher(&store, &client);

    let task = store.create("P1", sepia(), None).await;
    dispatcher.run_cycle().await;
    dispatcher.drain().await;

    let record = store.get(&task.key).await.unwrap();
    assert_eq!(record.status, TaskStatus::InProgress);
    assert!(record.dispatched_at.is_some());
}

#[tokio::test]
async fn overdue_task_expires_with_dispatch_timeout() {
    let store = Arc::new(TaskStore::new());
    let client = Arc::new(FakeWorkerClient::accepting());
    let dispatcher = dispatcher(&store, &client).with_dispatch_deadline(Duration::from_millis(10));

    let task = store.create("P1", sepia(), None).await;
    dispatcher.run_cycle().await;
    dispatcher.drain().await;

    tokio::time::sleep(Duration::from_millis(30)).await;
    let report = dispatcher.run_cycle().await;
    assert_eq!(report.expired, 1);

    let record = store.get(&task.key).await.unwrap();
    assert_eq!(record.status, TaskStatus::Error);
    assert_eq!(record.error_code.as_deref(), Some(DISPATCH_TIMEOUT_CODE));
    assert!(record.error_message.is_some());
}

#[tokio::test]
async fn finished_task_does_not_expire() {
    let store = Arc::new(TaskStore::new());
    let client = Arc::new(FakeWorkerClient::accepting());
    let dispatcher = dispatcher(&store, &client).with_dispatch_deadline(Duration::from_millis(10));

    let task = store.create("P1", sepia(), None).await;
    dispatcher.run_cycle().await;
    dispatcher.drain().await;
    store
        .complete(&task.key, REFERENCE_IMAGE.to_string())
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(30)).await;
    let report = dispatcher.run_cycle().await;

    assert_eq!(report.expired, 0);
    assert_eq!(store.get(&task.key).await.unwrap().status, TaskStatus::Done);
}

#[tokio::test]
async fn run_loop_dispatches_and_stops_on_cancel() {
    let store = Arc::new(TaskStore::new());
    let client = Arc::new(FakeWorkerClient::accepting());
    let dispatcher = dispatcher(&store, &client).with_poll_interval(Duration::from_millis(10));

    store.create("P1", sepia(), None).await;

    let cancel = CancellationToken::new();
    let handle = tokio::spawn({
        let cancel = cancel.clone();
        async move { dispatcher.run(cancel).await }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("dispatcher stops")
        .unwrap();

    assert_eq!(client.dispatched.lock().await.len(), 1);
}
