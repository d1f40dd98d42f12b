use std::sync::Arc;

use dashsync::defaults;
use dashsync::local::{self, LocalStore};
use dashsync::model::{CollectionKind, NewTask, RecordId};
use dashsync::source::SourceKind;
use dashsync::sync::PushOutcome;
use dashsync::Synchronizer;
use serde_json::json;

mod support;
use support::FakeRemote;

#[tokio::test]
async fn unreachable_remote_and_empty_local_yield_defaults() {
    let remote = Arc::new(FakeRemote::unreachable());
    let (sync, local) = support::memory_sync(remote.clone());
    assert!(sync.is_loading());

    let report = sync.start().await;

    assert!(!report.connected);
    assert!(!sync.is_connected());
    assert!(!sync.is_loading());
    assert_eq!(report.sheets.source, SourceKind::Defaults);
    assert_eq!(report.tasks.source, SourceKind::Defaults);
    assert_eq!(report.reconciled, None);

    let mut sheets = sync.sheets();
    sheets.sort_by_key(|sheet| sheet.id.to_string());
    assert_eq!(sheets, defaults::default_sheets());
    assert_eq!(sync.tasks().len(), defaults::default_tasks().len());

    // Offline startup never touches the remote beyond the probe.
    assert_eq!(remote.data_calls(), 0);
    assert!(local.get("allSheets").is_some());
    assert!(local.get("allTasks").is_some());
}

#[tokio::test]
async fn collections_fall_back_independently() {
    let remote = Arc::new(FakeRemote::online().with_collection(
        CollectionKind::Tasks,
        vec![json!({"id": 10, "title": "Remote task", "completed": true})],
    ));
    let (sync, _local) = support::memory_sync(remote.clone());

    let report = sync.start().await;

    assert!(report.connected);
    assert_eq!(report.sheets.source, SourceKind::Defaults);
    assert_eq!(report.tasks.source, SourceKind::Remote);
    assert_eq!(report.tasks.count, 1);
    assert_eq!(sync.tasks()[0].title, "Remote task");
    assert_eq!(sync.sheets().len(), defaults::default_sheets().len());
}

#[tokio::test]
async fn one_failing_fetch_does_not_block_the_other() {
    let remote = Arc::new(FakeRemote::online().with_collection(
        CollectionKind::Sheets,
        vec![json!({"id": 1, "title": "Remote", "url": "https://r"})],
    ));
    remote.fail_fetch(CollectionKind::Tasks, "timed out");
    let (sync, local) = support::memory_sync(remote.clone());
    local.set("allTasks", r#"[{"id": 5, "title": "Local task"}]"#);

    let report = sync.start().await;

    assert_eq!(report.sheets.source, SourceKind::Remote);
    assert_eq!(report.tasks.source, SourceKind::Local);
    assert_eq!(sync.tasks()[0].title, "Local task");
}

#[tokio::test]
async fn local_data_wins_over_defaults_when_offline() {
    let remote = Arc::new(FakeRemote::unreachable());
    let (sync, local) = support::memory_sync(remote);
    local.set(
        "allSheets",
        r#"[{"id": "abc", "title": "Saved", "url": "https://saved"}]"#,
    );

    let report = sync.start().await;

    assert_eq!(report.sheets.source, SourceKind::Local);
    assert_eq!(report.tasks.source, SourceKind::Defaults);
    let sheets = sync.sheets();
    assert_eq!(sheets.len(), 1);
    assert_eq!(sheets[0].id, RecordId::Text("abc".to_string()));
}

#[tokio::test]
async fn loaded_records_are_normalized() {
    let remote = Arc::new(FakeRemote::online().with_collection(
        CollectionKind::Tasks,
        vec![
            json!({"id": 1, "title": "Done", "status": "completed", "pinned": null}),
            json!({"id": 2, "title": "Flagged", "pinned": 1}),
            json!({"id": 3, "description": "no title"}),
            json!({"title": "No id"}),
        ],
    ));
    let (sync, _local) = support::memory_sync(remote);

    sync.start().await;
    let tasks = sync.tasks();

    assert_eq!(tasks.len(), 3);
    // Pinned first.
    assert_eq!(tasks[0].title, "Flagged");
    assert!(tasks[0].pinned);
    let done = tasks.iter().find(|t| t.title == "Done").unwrap();
    assert!(done.completed);
    assert!(!done.pinned);
    let generated = tasks.iter().find(|t| t.title == "No id").unwrap();
    assert!(matches!(generated.id, RecordId::Text(_)));
}

#[tokio::test]
async fn connected_startup_pushes_loaded_state_back() {
    let remote = Arc::new(FakeRemote::online());
    let (sync, _local) = support::memory_sync(remote.clone());

    let report = sync.start().await;

    assert_eq!(report.reconciled, Some(true));
    let pushed = remote.last_push(CollectionKind::Sheets).unwrap();
    assert_eq!(pushed.len(), defaults::default_sheets().len());
    assert!(remote.last_push(CollectionKind::Tasks).is_some());
}

#[tokio::test]
async fn failed_reconciliation_is_reported_not_fatal() {
    let remote = Arc::new(FakeRemote::online());
    remote.set_push_ok(false);
    let (sync, _local) = support::memory_sync(remote);

    let report = sync.start().await;

    assert!(report.connected);
    assert_eq!(report.reconciled, Some(false));
    assert!(!sync.is_loading());
    assert!(!sync.sheets().is_empty());
}

#[tokio::test]
async fn reconnect_pushes_local_state() {
    let remote = Arc::new(FakeRemote::unreachable());
    let (sync, _local) = support::memory_sync(remote.clone());
    sync.start().await;
    assert_eq!(remote.pushes().len(), 0);

    remote.set_healthy(true);
    assert!(sync.reconnect().await);
    assert!(sync.is_connected());

    let pushed = remote.last_push(CollectionKind::Tasks).unwrap();
    assert_eq!(pushed.len(), sync.tasks().len());

    // Already connected: no second push.
    let before = remote.pushes().len();
    assert!(sync.reconnect().await);
    assert_eq!(remote.pushes().len(), before);
}

#[tokio::test]
async fn unpushed_change_wins_on_next_connected_start() {
    let remote = Arc::new(FakeRemote::online().with_collection(
        CollectionKind::Tasks,
        vec![json!({"id": 1, "title": "Remote"})],
    ));
    let (first, store) = support::memory_sync(remote.clone());
    first.start().await;

    remote.set_push_ok(false);
    let added = first
        .add_task(NewTask {
            title: "Kept".to_string(),
            ..NewTask::default()
        })
        .await
        .unwrap();
    assert_eq!(added.remote, PushOutcome::Failed);
    assert!(local::is_pending(&*store, CollectionKind::Tasks));
    drop(first);

    remote.set_push_ok(true);
    let second = Synchronizer::new(remote.clone(), store.clone());
    let report = second.start().await;

    assert_eq!(report.tasks.source, SourceKind::Local);
    assert_eq!(report.sheets.source, SourceKind::Remote);
    assert_eq!(report.reconciled, Some(true));
    assert!(second.tasks().iter().any(|t| t.title == "Kept"));
    let pushed = remote.last_push(CollectionKind::Tasks).unwrap();
    assert!(pushed.iter().any(|t| t["title"] == "Kept"));
    assert!(!local::is_pending(&*store, CollectionKind::Tasks));

    // Once pushed, the remote leads again.
    let third = Synchronizer::new(remote, store);
    assert_eq!(third.start().await.tasks.source, SourceKind::Remote);
}

#[tokio::test]
async fn offline_edits_are_pushed_by_reconnect() {
    let remote = Arc::new(FakeRemote::unreachable());
    let (sync, store) = support::memory_sync(remote.clone());
    sync.start().await;
    sync.add_task(NewTask {
        title: "Offline".to_string(),
        ..NewTask::default()
    })
    .await
    .unwrap();
    assert!(local::is_pending(&*store, CollectionKind::Tasks));

    remote.set_healthy(true);
    remote.set_push_ok(true);
    assert!(sync.reconnect().await);
    assert!(!local::is_pending(&*store, CollectionKind::Tasks));
}
