use std::sync::Arc;

use dashsync::model::{
    CollectionKind, NewSheet, NewTask, RecordId, SheetPatch, SheetStatus, TaskPatch, JUST_NOW,
};
use dashsync::remote::OfflineRemote;
use dashsync::source::SourceKind;
use dashsync::sync::PushOutcome;
use dashsync::view::SheetFilter;
use serde_json::json;

mod support;
use support::FakeRemote;

fn new_sheet(title: &str) -> NewSheet {
    NewSheet {
        title: title.to_string(),
        url: format!("https://docs.example.com/{title}"),
        ..NewSheet::default()
    }
}

fn new_task(title: &str) -> NewTask {
    NewTask {
        title: title.to_string(),
        ..NewTask::default()
    }
}

#[tokio::test]
async fn add_then_remove_restores_previous_collection() {
    let remote = Arc::new(FakeRemote::online());
    let (sync, _local) = support::memory_sync(remote.clone());
    sync.start().await;
    let before = sync.sheets();

    let added = sync.add_sheet(new_sheet("Budget")).await.unwrap();
    assert_eq!(added.remote, PushOutcome::Pushed);
    assert_eq!(added.value.last_updated, JUST_NOW);
    assert!(!added.value.pinned);
    assert_eq!(sync.sheets().len(), before.len() + 1);

    let removed = sync.remove_sheet(&added.value.id).await;
    assert_eq!(removed.value.map(|s| s.title), Some("Budget".to_string()));
    assert_eq!(sync.sheets(), before);
    assert_eq!(
        remote.last_push(CollectionKind::Sheets).unwrap().len(),
        before.len()
    );
}

#[tokio::test]
async fn added_records_get_distinct_ids() {
    let remote = Arc::new(FakeRemote::unreachable());
    let (sync, _local) = support::memory_sync(remote);
    sync.start().await;

    let first = sync.add_task(new_task("One")).await.unwrap().value;
    let second = sync.add_task(new_task("Two")).await.unwrap().value;
    assert_ne!(first.id, second.id);
}

#[tokio::test]
async fn blank_titles_are_rejected() {
    let remote = Arc::new(FakeRemote::unreachable());
    let (sync, _local) = support::memory_sync(remote);
    sync.start().await;
    let before = sync.tasks().len();

    let err = sync.add_task(new_task("   ")).await.unwrap_err();
    assert_eq!(err.exit_code(), 2);
    assert_eq!(sync.tasks().len(), before);

    let err = sync
        .add_sheet(NewSheet {
            title: "No url".to_string(),
            ..NewSheet::default()
        })
        .await
        .unwrap_err();
    assert!(err.to_string().contains("url"));
}

#[tokio::test]
async fn removing_missing_id_is_a_noop() {
    let remote = Arc::new(FakeRemote::online());
    let (sync, _local) = support::memory_sync(remote);
    sync.start().await;
    let before = sync.tasks();

    let removed = sync.remove_task(&RecordId::Number(999)).await;
    assert!(removed.value.is_none());
    assert_eq!(sync.tasks(), before);
}

#[tokio::test]
async fn double_pin_toggle_restores_order() {
    let remote = Arc::new(FakeRemote::unreachable());
    let (sync, _local) = support::memory_sync(remote);
    sync.start().await;
    let before = sync.sheets();
    let last = before.last().unwrap().id.clone();

    let pinned = sync.toggle_sheet_pin(&last).await.value.unwrap();
    assert!(pinned.pinned);
    assert!(sync.sheets().iter().take_while(|s| s.pinned).any(|s| s.id == last));

    sync.toggle_sheet_pin(&last).await;
    assert_eq!(sync.sheets(), before);
}

#[tokio::test]
async fn pinned_records_sort_first_stably() {
    let remote = Arc::new(FakeRemote::unreachable());
    let (sync, _local) = support::memory_sync(remote);
    sync.start().await;

    sync.replace_tasks(vec![
        json!({"id": "a", "title": "A"}),
        json!({"id": "b", "title": "B", "pinned": true}),
        json!({"id": "c", "title": "C"}),
        json!({"id": "d", "title": "D", "pinned": true}),
    ])
    .await;

    let order: Vec<String> = sync.tasks().into_iter().map(|t| t.title).collect();
    assert_eq!(order, ["B", "D", "A", "C"]);
}

#[tokio::test]
async fn sheet_update_stamps_last_updated() {
    let remote = Arc::new(FakeRemote::unreachable());
    let (sync, _local) = support::memory_sync(remote);
    sync.start().await;
    sync.replace_sheets(vec![json!({
        "id": 1,
        "title": "Old",
        "url": "https://old",
        "lastUpdated": "2 days ago"
    })])
    .await;

    let updated = sync
        .update_sheet(
            &RecordId::Number(1),
            &SheetPatch {
                title: Some("New".to_string()),
                status: Some(SheetStatus::Pending),
                ..SheetPatch::default()
            },
        )
        .await
        .value
        .unwrap();

    assert_eq!(updated.title, "New");
    assert_eq!(updated.url, "https://old");
    assert_eq!(updated.status, SheetStatus::Pending);
    assert_eq!(updated.last_updated, JUST_NOW);
}

#[tokio::test]
async fn task_status_drives_completed() {
    let remote = Arc::new(FakeRemote::unreachable());
    let (sync, _local) = support::memory_sync(remote);
    sync.start().await;
    let id = sync.add_task(new_task("Report")).await.unwrap().value.id;

    let done = sync
        .update_task(
            &id,
            &TaskPatch {
                status: Some("completed".to_string()),
                ..TaskPatch::default()
            },
        )
        .await
        .value
        .unwrap();
    assert!(done.completed);

    let renamed = sync
        .update_task(
            &id,
            &TaskPatch {
                title: Some("Quarterly report".to_string()),
                ..TaskPatch::default()
            },
        )
        .await
        .value
        .unwrap();
    assert!(renamed.completed);

    let reopened = sync.toggle_task(&id).await.value.unwrap();
    assert!(!reopened.completed);
}

#[tokio::test]
async fn offline_mutation_survives_reload_without_remote() {
    let dir = tempfile::tempdir().expect("tempdir");
    let remote = Arc::new(FakeRemote::unreachable());

    let sync = support::file_sync(remote.clone(), dir.path());
    sync.start().await;
    let added = sync.add_task(new_task("Offline")).await.unwrap();
    assert_eq!(added.remote, PushOutcome::Offline);
    assert!(sync.task(&added.value.id).is_some());
    drop(sync);

    let reloaded = support::file_sync(Arc::new(OfflineRemote), dir.path());
    let report = reloaded.start().await;
    assert_eq!(report.tasks.source, SourceKind::Local);
    assert!(reloaded.task(&added.value.id).is_some());

    assert_eq!(remote.data_calls(), 0);
}

#[tokio::test]
async fn failed_push_keeps_local_state() {
    let remote = Arc::new(FakeRemote::online());
    let (sync, local) = support::memory_sync(remote.clone());
    sync.start().await;
    remote.set_push_ok(false);

    let added = sync.add_sheet(new_sheet("Kept")).await.unwrap();

    assert_eq!(added.remote, PushOutcome::Failed);
    assert!(sync.sheet(&added.value.id).is_some());
    let saved = dashsync::local::load_collection::<dashsync::model::SheetLink>(&*local);
    assert!(saved.iter().any(|s| s.title == "Kept"));
}

#[tokio::test]
async fn replace_drops_invalid_elements() {
    let remote = Arc::new(FakeRemote::online());
    let (sync, _local) = support::memory_sync(remote.clone());
    sync.start().await;

    let mutation = sync
        .replace_sheets(vec![
            json!({"title": "A", "url": "https://a"}),
            json!({"title": "", "url": "https://b"}),
            json!("not a record"),
        ])
        .await;

    assert_eq!(mutation.value, 1);
    assert_eq!(mutation.remote, PushOutcome::Pushed);
    assert_eq!(sync.sheets().len(), 1);
    assert_eq!(remote.last_push(CollectionKind::Sheets).unwrap().len(), 1);
}

#[tokio::test]
async fn reads_filter_and_summarize() {
    let remote = Arc::new(FakeRemote::unreachable());
    let (sync, _local) = support::memory_sync(remote);
    sync.start().await;
    sync.replace_sheets(vec![
        json!({"id": 1, "title": "Sales", "url": "https://s", "category": "Finance"}),
        json!({"id": 2, "title": "Roster", "url": "https://r", "category": "HR", "status": "inactive"}),
        json!({"id": 3, "title": "Payroll", "url": "https://p", "category": "Finance", "pinned": true}),
    ])
    .await;

    let finance = sync.filtered_sheets(&SheetFilter {
        category: Some("Finance".to_string()),
        ..SheetFilter::default()
    });
    let titles: Vec<&str> = finance.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(titles, ["Payroll", "Sales"]);
    assert_eq!(sync.categories(), ["Finance", "HR"]);

    let stats = sync.stats();
    assert_eq!(stats.sheets, 3);
    assert_eq!(stats.pinned_sheets, 1);
    assert_eq!(stats.total_tasks, stats.completed_tasks + stats.pending_tasks);
}
