//! The data synchronizer.
//!
//! Owns the in-memory view of both collections for one client session and
//! reconciles it with the local store and the remote mirror:
//!
//! - **Startup** probes the remote, loads each collection independently
//!   through remote -> local -> defaults, persists the result locally and,
//!   when connected, pushes it back so both sides agree. A collection whose
//!   last local change never reached the remote is marked pending in the
//!   local store and loads local -> remote -> defaults instead.
//! - **Mutations** compute the next collection from the current one, swap
//!   it in memory, persist it locally and then push it to the remote if
//!   connected. A failed push is logged and never rolled back: local state
//!   is authoritative, and the next connected startup or reconnect pushes it.
//! - **Reads** return collections pinned-first.
//!
//! The state lock is never held across an await point, so a second
//! mutation issued while the first one's push is in flight computes from
//! the state the first one already installed.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde_json::Value;

use crate::defaults;
use crate::error::Result;
use crate::local::{self, LocalStore};
use crate::model::{
    self, CollectionKind, NewSheet, NewTask, Record, RecordId, SheetLink, SheetPatch, Task,
    TaskPatch,
};
use crate::remote::RemoteStore;
use crate::source::{DefaultSource, LocalSource, RemoteSource, SourceChain, SourceKind};
use crate::view::{self, DashboardStats, SheetFilter};

/// What happened to the remote mirror after a mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PushOutcome {
    Pushed,
    Failed,
    /// Not connected; the remote was not contacted
    Offline,
}

/// Result of a mutation plus the fate of its remote push
#[derive(Debug, Clone, Serialize)]
pub struct Mutation<R> {
    pub value: R,
    pub remote: PushOutcome,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CollectionReport {
    pub source: SourceKind,
    pub count: usize,
}

/// Summary of the startup protocol
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub connected: bool,
    pub sheets: CollectionReport,
    pub tasks: CollectionReport,
    /// Whether the push-back after loading succeeded; `None` when offline
    pub reconciled: Option<bool>,
}

#[derive(Debug, Default)]
struct SyncState {
    sheets: Vec<SheetLink>,
    tasks: Vec<Task>,
    loading: bool,
    connected: bool,
}

/// Maps a record type to its slot in the session state.
trait Stored: Record {
    fn slot(state: &mut SyncState) -> &mut Vec<Self>;
}

impl Stored for SheetLink {
    fn slot(state: &mut SyncState) -> &mut Vec<Self> {
        &mut state.sheets
    }
}

impl Stored for Task {
    fn slot(state: &mut SyncState) -> &mut Vec<Self> {
        &mut state.tasks
    }
}

/// Clears `loading` however the load ends (return, panic, cancellation).
struct LoadingGuard<'a> {
    state: &'a Mutex<SyncState>,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .loading = false;
    }
}

pub struct Synchronizer {
    remote: Arc<dyn RemoteStore>,
    local: Arc<dyn LocalStore>,
    state: Mutex<SyncState>,
}

impl Synchronizer {
    /// A session that has not loaded yet (`is_loading()` is true).
    pub fn new(remote: Arc<dyn RemoteStore>, local: Arc<dyn LocalStore>) -> Self {
        Self {
            remote,
            local,
            state: Mutex::new(SyncState {
                loading: true,
                ..SyncState::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SyncState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Startup
    // =========================================================================

    /// Run the startup protocol. Never fails; `loading` is cleared on exit.
    pub async fn start(&self) -> LoadReport {
        self.lock().loading = true;
        let _loading = LoadingGuard { state: &self.state };

        let connected = self.remote.check_health().await;
        self.lock().connected = connected;
        tracing::info!(connected, "remote probe finished");

        let sheets_pending = local::is_pending(self.local.as_ref(), CollectionKind::Sheets);
        let tasks_pending = local::is_pending(self.local.as_ref(), CollectionKind::Tasks);
        if sheets_pending || tasks_pending {
            tracing::info!(sheets_pending, tasks_pending, "unpushed local changes found");
        }

        let sheets_chain = self.chain(connected, sheets_pending, defaults::default_sheets);
        let tasks_chain = self.chain(connected, tasks_pending, defaults::default_tasks);

        // Independent loads: one collection's failure never blocks the other.
        let (sheets, tasks) = tokio::join!(sheets_chain.load(), tasks_chain.load());

        {
            let mut state = self.lock();
            state.sheets = sheets.records.clone();
            state.tasks = tasks.records.clone();
        }

        local::save_collection(self.local.as_ref(), &sheets.records);
        local::save_collection(self.local.as_ref(), &tasks.records);

        let reconciled = if connected {
            Some(self.push_all(&sheets.records, &tasks.records).await)
        } else {
            None
        };

        let report = LoadReport {
            connected,
            sheets: CollectionReport {
                source: sheets.source,
                count: sheets.records.len(),
            },
            tasks: CollectionReport {
                source: tasks.source,
                count: tasks.records.len(),
            },
            reconciled,
        };
        tracing::info!(
            sheets_source = report.sheets.source.as_str(),
            sheets = report.sheets.count,
            tasks_source = report.tasks.source.as_str(),
            tasks = report.tasks.count,
            "collections loaded"
        );
        report
    }

    fn chain<T: Record>(
        &self,
        connected: bool,
        local_first: bool,
        seed: fn() -> Vec<T>,
    ) -> SourceChain<T> {
        let mut chain = SourceChain::new();
        if local_first {
            chain = chain.with(LocalSource::new(Arc::clone(&self.local)));
        }
        if connected {
            chain = chain.with(RemoteSource::new(Arc::clone(&self.remote)));
        }
        if !local_first {
            chain = chain.with(LocalSource::new(Arc::clone(&self.local)));
        }
        chain.with(DefaultSource::new(seed))
    }

    async fn push_all(&self, sheets: &[SheetLink], tasks: &[Task]) -> bool {
        let (sheets_ok, tasks_ok) = tokio::join!(
            self.remote
                .push_collection(CollectionKind::Sheets, model::to_values(sheets)),
            self.remote
                .push_collection(CollectionKind::Tasks, model::to_values(tasks)),
        );
        // A failure leaves the marker as it was: only local edits set it.
        if sheets_ok {
            local::set_pending(self.local.as_ref(), CollectionKind::Sheets, false);
        }
        if tasks_ok {
            local::set_pending(self.local.as_ref(), CollectionKind::Tasks, false);
        }
        if !(sheets_ok && tasks_ok) {
            tracing::warn!(sheets_ok, tasks_ok, "remote reconciliation incomplete");
        }
        sheets_ok && tasks_ok
    }

    /// Re-probe the remote. On a transition to connected the current local
    /// state is pushed, overwriting the remote.
    pub async fn reconnect(&self) -> bool {
        let was_connected = self.is_connected();
        let connected = self.remote.check_health().await;
        self.lock().connected = connected;

        if connected && !was_connected {
            let (sheets, tasks) = {
                let state = self.lock();
                (state.sheets.clone(), state.tasks.clone())
            };
            tracing::info!("remote reachable again; pushing local state");
            self.push_all(&sheets, &tasks).await;
        }
        connected
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    pub fn is_connected(&self) -> bool {
        self.lock().connected
    }

    /// Sheets, pinned first
    pub fn sheets(&self) -> Vec<SheetLink> {
        model::pinned_first(&self.lock().sheets)
    }

    /// Tasks, pinned first
    pub fn tasks(&self) -> Vec<Task> {
        model::pinned_first(&self.lock().tasks)
    }

    pub fn sheet(&self, id: &RecordId) -> Option<SheetLink> {
        self.lock().sheets.iter().find(|s| &s.id == id).cloned()
    }

    pub fn task(&self, id: &RecordId) -> Option<Task> {
        self.lock().tasks.iter().find(|t| &t.id == id).cloned()
    }

    pub fn filtered_sheets(&self, filter: &SheetFilter) -> Vec<SheetLink> {
        filter.apply(&self.sheets())
    }

    pub fn categories(&self) -> Vec<String> {
        view::categories(&self.lock().sheets)
    }

    pub fn stats(&self) -> DashboardStats {
        let state = self.lock();
        DashboardStats::compute(&state.sheets, &state.tasks)
    }

    // =========================================================================
    // Mutation pipeline
    // =========================================================================

    async fn apply<T, R, F>(&self, mutate: F) -> Mutation<R>
    where
        T: Stored,
        R: Send,
        F: FnOnce(&[T]) -> (Vec<T>, R) + Send,
    {
        let (next, value, connected) = {
            let mut guard = self.lock();
            let state = &mut *guard;
            let (next, value) = mutate(T::slot(state));
            *T::slot(state) = next.clone();
            (next, value, state.connected)
        };

        local::save_collection(self.local.as_ref(), &next);

        let remote = if connected {
            if self
                .remote
                .push_collection(T::KIND, model::to_values(&next))
                .await
            {
                PushOutcome::Pushed
            } else {
                tracing::warn!(kind = %T::KIND, "remote push failed; keeping local state");
                PushOutcome::Failed
            }
        } else {
            tracing::debug!(kind = %T::KIND, "offline; saved locally only");
            PushOutcome::Offline
        };
        local::set_pending(self.local.as_ref(), T::KIND, remote != PushOutcome::Pushed);

        Mutation { value, remote }
    }

    async fn add<T: Stored>(&self, record: T, assign: fn(T, RecordId) -> T) -> Mutation<T> {
        self.apply(move |current: &[T]| {
            let record = assign(record, unique_id(current));
            let mut next = current.to_vec();
            next.push(record.clone());
            (next, record)
        })
        .await
    }

    async fn update<T, F>(&self, id: &RecordId, change: F) -> Mutation<Option<T>>
    where
        T: Stored,
        F: Fn(&T) -> T + Send,
    {
        self.apply(move |current: &[T]| {
            let mut updated = None;
            let next: Vec<T> = current
                .iter()
                .map(|record| {
                    if record.id() == id {
                        let changed = change(record);
                        updated.get_or_insert_with(|| changed.clone());
                        changed
                    } else {
                        record.clone()
                    }
                })
                .collect();
            (next, updated)
        })
        .await
    }

    async fn remove<T: Stored>(&self, id: &RecordId) -> Mutation<Option<T>> {
        self.apply(|current: &[T]| {
            let (removed, kept): (Vec<T>, Vec<T>) =
                current.iter().cloned().partition(|record| record.id() == id);
            (kept, removed.into_iter().next())
        })
        .await
    }

    async fn replace<T: Stored>(&self, values: Vec<Value>) -> Mutation<usize> {
        let records: Vec<T> = model::normalize_values(values);
        self.apply(move |_: &[T]| {
            let count = records.len();
            (records, count)
        })
        .await
    }

    // =========================================================================
    // Sheets
    // =========================================================================

    /// Append a new sheet with a fresh id.
    pub async fn add_sheet(&self, input: NewSheet) -> Result<Mutation<SheetLink>> {
        let record = input.into_record(RecordId::generate())?;
        Ok(self
            .add(record, |sheet, id| SheetLink { id, ..sheet })
            .await)
    }

    /// Merge `patch` into the sheet and stamp `lastUpdated`.
    pub async fn update_sheet(
        &self,
        id: &RecordId,
        patch: &SheetPatch,
    ) -> Mutation<Option<SheetLink>> {
        self.update(id, |sheet: &SheetLink| sheet.patched(patch)).await
    }

    pub async fn remove_sheet(&self, id: &RecordId) -> Mutation<Option<SheetLink>> {
        self.remove(id).await
    }

    pub async fn toggle_sheet_pin(&self, id: &RecordId) -> Mutation<Option<SheetLink>> {
        self.update(id, |sheet: &SheetLink| sheet.with_pinned(!sheet.pinned))
            .await
    }

    /// Replace every sheet; invalid elements are dropped.
    pub async fn replace_sheets(&self, values: Vec<Value>) -> Mutation<usize> {
        self.replace::<SheetLink>(values).await
    }

    // =========================================================================
    // Tasks
    // =========================================================================

    pub async fn add_task(&self, input: NewTask) -> Result<Mutation<Task>> {
        let record = input.into_record(RecordId::generate())?;
        Ok(self.add(record, |task, id| Task { id, ..task }).await)
    }

    /// Merge `patch`; a provided status sets `completed`.
    pub async fn update_task(&self, id: &RecordId, patch: &TaskPatch) -> Mutation<Option<Task>> {
        self.update(id, |task: &Task| task.patched(patch)).await
    }

    pub async fn remove_task(&self, id: &RecordId) -> Mutation<Option<Task>> {
        self.remove(id).await
    }

    /// Flip `completed`.
    pub async fn toggle_task(&self, id: &RecordId) -> Mutation<Option<Task>> {
        self.update(id, Task::toggled).await
    }

    pub async fn toggle_task_pin(&self, id: &RecordId) -> Mutation<Option<Task>> {
        self.update(id, |task: &Task| task.with_pinned(!task.pinned))
            .await
    }

    pub async fn replace_tasks(&self, values: Vec<Value>) -> Mutation<usize> {
        self.replace::<Task>(values).await
    }
}

fn unique_id<T: Record>(current: &[T]) -> RecordId {
    loop {
        let id = RecordId::generate();
        if current.iter().all(|record| record.id() != &id) {
            return id;
        }
    }
}
