//! dashsync task command implementations

use std::path::PathBuf;

use serde::Serialize;

use crate::cli::{describe_push, not_found, read_import, SessionOptions};
use crate::error::Result;
use crate::model::{CollectionKind, NewTask, RecordId, Task, TaskPatch};
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::source::SourceKind;
use crate::sync::PushOutcome;

/// Options for `dashsync task list`
pub struct ListOptions {
    pub completed: bool,
    pub pending: bool,
    pub session: SessionOptions,
    pub json: bool,
    pub quiet: bool,
}

/// Options for `dashsync task add`
pub struct AddOptions {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub due_date: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    pub pinned: bool,
    pub session: SessionOptions,
    pub json: bool,
    pub quiet: bool,
}

/// Options for `dashsync task update`
pub struct UpdateOptions {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub due_date: Option<String>,
    pub category: Option<String>,
    pub pinned: Option<bool>,
    pub session: SessionOptions,
    pub json: bool,
    pub quiet: bool,
}

/// Options for commands addressing one task (`rm`, `toggle`, `pin`)
pub struct IdOptions {
    pub id: String,
    pub session: SessionOptions,
    pub json: bool,
    pub quiet: bool,
}

/// Options for `dashsync task import`
pub struct ImportOptions {
    pub file: PathBuf,
    pub session: SessionOptions,
    pub json: bool,
    pub quiet: bool,
}

#[derive(Serialize)]
struct ListReport {
    source: SourceKind,
    connected: bool,
    total: usize,
    count: usize,
    tasks: Vec<Task>,
}

#[derive(Serialize)]
struct TaskReport {
    task: Task,
    remote: PushOutcome,
}

#[derive(Serialize)]
struct ImportReport {
    imported: usize,
    dropped: usize,
    remote: PushOutcome,
}

fn output(json: bool, quiet: bool) -> OutputOptions {
    OutputOptions { json, quiet }
}

fn task_line(task: &Task) -> String {
    let check = if task.completed { "[x]" } else { "[ ]" };
    let pin = if task.pinned { "* " } else { "" };
    let mut line = format!("{check} {pin}{} (id {})", task.title, task.id);
    if let Some(priority) = &task.priority {
        line.push_str(&format!(" priority={priority}"));
    }
    if let Some(due) = &task.due_date {
        line.push_str(&format!(" due={due}"));
    }
    line
}

fn task_human(header: String, task: &Task, remote: PushOutcome) -> HumanOutput {
    let mut human = HumanOutput::new(header);
    human.push_summary("id", task.id.to_string());
    human.push_summary("title", task.title.clone());
    human.push_summary("completed", if task.completed { "yes" } else { "no" });
    human.push_summary("pinned", if task.pinned { "yes" } else { "no" });
    if let Some(category) = &task.category {
        human.push_summary("category", category.clone());
    }
    describe_push(&mut human, remote);
    human
}

/// Look the task up first so a missing id is an error, not a silent no-op.
async fn mutate_existing<F, Fut>(
    options: IdOptions,
    command: &str,
    header: impl Fn(&Task) -> String,
    mutate: F,
) -> Result<()>
where
    F: FnOnce(crate::cli::Session, RecordId) -> Fut,
    Fut: std::future::Future<Output = crate::sync::Mutation<Option<Task>>>,
{
    let id = RecordId::parse(&options.id);
    let session = options.session.open().await?;
    if session.sync.task(&id).is_none() {
        return Err(not_found(CollectionKind::Tasks, &id));
    }

    let mutation = mutate(session, id.clone()).await;
    let task = mutation
        .value
        .ok_or_else(|| not_found(CollectionKind::Tasks, &id))?;

    let human = task_human(header(&task), &task, mutation.remote);
    let report = TaskReport {
        task,
        remote: mutation.remote,
    };

    emit_success(
        output(options.json, options.quiet),
        command,
        &report,
        Some(&human),
    )
}

pub async fn run_list(options: ListOptions) -> Result<()> {
    let session = options.session.open().await?;
    let tasks: Vec<Task> = session
        .sync
        .tasks()
        .into_iter()
        .filter(|task| {
            if options.completed {
                task.completed
            } else if options.pending {
                !task.completed
            } else {
                true
            }
        })
        .collect();

    let report = ListReport {
        source: session.report.tasks.source,
        connected: session.report.connected,
        total: session.report.tasks.count,
        count: tasks.len(),
        tasks,
    };

    let mut human = HumanOutput::new(format!(
        "dashsync task list: {} of {} tasks",
        report.count, report.total
    ));
    human.push_summary("source", report.source.as_str());
    for task in &report.tasks {
        human.push_detail(task_line(task));
    }
    if !report.connected {
        human.push_warning("remote unreachable; showing local data");
    }

    emit_success(
        output(options.json, options.quiet),
        "task list",
        &report,
        Some(&human),
    )
}

pub async fn run_add(options: AddOptions) -> Result<()> {
    let input = NewTask {
        title: options.title,
        description: options.description,
        completed: None,
        status: options.status,
        priority: options.priority,
        due_date: options.due_date,
        category: options.category,
        pinned: Some(options.pinned),
    };
    let session = options.session.open().await?;
    let mutation = session.sync.add_task(input).await?;

    let human = task_human(
        format!("dashsync task add: {}", mutation.value.title),
        &mutation.value,
        mutation.remote,
    );
    let report = TaskReport {
        task: mutation.value,
        remote: mutation.remote,
    };

    emit_success(
        output(options.json, options.quiet),
        "task add",
        &report,
        Some(&human),
    )
}

pub async fn run_update(options: UpdateOptions) -> Result<()> {
    let patch = TaskPatch {
        title: options.title,
        description: options.description,
        status: options.status,
        priority: options.priority,
        due_date: options.due_date,
        category: options.category,
        pinned: options.pinned,
    };
    mutate_existing(
        IdOptions {
            id: options.id,
            session: options.session,
            json: options.json,
            quiet: options.quiet,
        },
        "task update",
        |task| format!("dashsync task update: {}", task.title),
        |session, id| async move { session.sync.update_task(&id, &patch).await },
    )
    .await
}

pub async fn run_rm(options: IdOptions) -> Result<()> {
    mutate_existing(
        options,
        "task rm",
        |task| format!("dashsync task rm: {}", task.title),
        |session, id| async move { session.sync.remove_task(&id).await },
    )
    .await
}

pub async fn run_toggle(options: IdOptions) -> Result<()> {
    mutate_existing(
        options,
        "task toggle",
        |task| {
            let state = if task.completed { "completed" } else { "reopened" };
            format!("dashsync task toggle: {} {state}", task.title)
        },
        |session, id| async move { session.sync.toggle_task(&id).await },
    )
    .await
}

pub async fn run_pin(options: IdOptions) -> Result<()> {
    mutate_existing(
        options,
        "task pin",
        |task| {
            let verb = if task.pinned { "pinned" } else { "unpinned" };
            format!("dashsync task pin: {} {verb}", task.title)
        },
        |session, id| async move { session.sync.toggle_task_pin(&id).await },
    )
    .await
}

pub async fn run_import(options: ImportOptions) -> Result<()> {
    let values = read_import(&options.file, CollectionKind::Tasks)?;
    let total = values.len();
    let session = options.session.open().await?;

    let mutation = session.sync.replace_tasks(values).await;
    let report = ImportReport {
        imported: mutation.value,
        dropped: total - mutation.value,
        remote: mutation.remote,
    };

    let mut human = HumanOutput::new(format!("dashsync task import: {} tasks", report.imported));
    human.push_summary("file", options.file.display().to_string());
    if report.dropped > 0 {
        human.push_warning(format!("{} invalid records dropped", report.dropped));
    }
    describe_push(&mut human, mutation.remote);

    emit_success(
        output(options.json, options.quiet),
        "task import",
        &report,
        Some(&human),
    )
}
