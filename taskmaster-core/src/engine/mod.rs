//! Local-remote sync engine.
//!
//! The engine owns the [`AppState`] and is the only thing that mutates it.
//! Every mutation is persisted to the [`LocalStore`] and, while a session is
//! synced, queued as a remote write. Remote listeners deliver full snapshots
//! as [`RemoteEvent`]s on a channel the engine drains; each snapshot
//! replaces the matching local collection outright.
//!
//! # Phases
//!
//! ```text
//! LoggedOut --session--> Migrating --listeners attached--> Synced
//!     ^                                                      |
//!     +------------------------sign-out----------------------+
//! ```
//!
//! Migration uploads the local collections once per installation, guarded
//! by the `migrated_to_remote` flag. Local edits that have not reached the
//! remote store when a snapshot arrives are overwritten by that snapshot.

mod autosave;
mod state;
mod writer;

pub use autosave::{NoteDraft, AUTOSAVE_DELAY};
pub use state::{AppState, Change};

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};

use crate::local_store::{keys, LocalStore};
use crate::models::{
    Category, EntityId, Note, Priority, Reminder, RepeatInterval, Session, Settings, Stats, Task,
    TaskFilter,
};
use crate::remote::{
    CollectionKind, Document, Entity, EventSink, RemoteError, RemoteEvent, RemotePayload,
    RemoteScope, RemoteStore, RemoteTarget, Subscription,
};
use crate::status::StatusReporter;
use crate::transfer::{ExportDocument, ImportDocument};
use autosave::Debouncer;
use writer::{RemoteWriter, WriteOp};

/// How often reminders are checked while the engine runs.
pub const REMINDER_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Gap between neighbouring ranks after a full re-rank, and between the
/// end of the list and a task moved past it.
const RANK_STEP: f64 = 1024.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    LoggedOut,
    Migrating,
    Synced,
}

type Listener = Box<dyn FnMut(&Change, &AppState) + Send>;

pub struct SyncEngine {
    store: LocalStore,
    remote: Arc<dyn RemoteStore>,
    status: StatusReporter,
    state: AppState,
    phase: SyncPhase,
    session: Option<Session>,
    subscriptions: Vec<Subscription>,
    /// Bumped whenever listeners are replaced; events from older
    /// generations are stale.
    generation: u64,
    events_tx: mpsc::UnboundedSender<RemoteEvent>,
    events_rx: mpsc::UnboundedReceiver<RemoteEvent>,
    awaiting_initial: HashSet<RemoteTarget>,
    writer: RemoteWriter,
    listeners: Vec<Listener>,
    autosave: Debouncer,
}

impl SyncEngine {
    /// Loads local state and starts the remote writer.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(store: LocalStore, remote: Arc<dyn RemoteStore>, status: StatusReporter) -> Self {
        let state = AppState::load(&store);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let writer = RemoteWriter::spawn(remote.clone(), status.clone());

        Self {
            store,
            remote,
            status,
            state,
            phase: SyncPhase::LoggedOut,
            session: None,
            subscriptions: Vec::new(),
            generation: 0,
            events_tx,
            events_rx,
            awaiting_initial: HashSet::new(),
            writer,
            listeners: Vec::new(),
            autosave: Debouncer::new(AUTOSAVE_DELAY),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn status(&self) -> &StatusReporter {
        &self.status
    }

    /// Registers a callback run after every state change.
    pub fn on_change(&mut self, listener: impl FnMut(&Change, &AppState) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    fn notify(&mut self, change: Change) {
        for listener in &mut self.listeners {
            listener(&change, &self.state);
        }
    }

    fn set_phase(&mut self, phase: SyncPhase) {
        if self.phase != phase {
            tracing::debug!(from = ?self.phase, to = ?phase, "sync phase");
            self.phase = phase;
            self.notify(Change::Phase(phase));
        }
    }

    // ---- session lifecycle -------------------------------------------------

    /// Reacts to a login, logout or account switch.
    pub async fn handle_session(&mut self, session: Option<Session>) {
        match session {
            Some(session) if session.sync_enabled => {
                if self.phase == SyncPhase::Synced && self.session.as_ref() == Some(&session) {
                    return;
                }
                if self.phase != SyncPhase::LoggedOut {
                    self.stop_sync();
                }
                self.start_sync(session).await;
            }
            _ => {
                if self.phase != SyncPhase::LoggedOut || self.session.is_some() {
                    self.stop_sync();
                }
            }
        }
    }

    async fn start_sync(&mut self, session: Session) {
        tracing::info!(user_id = %session.user_id, "starting sync");
        let scope = RemoteScope::from(&session);
        self.session = Some(session);
        self.set_phase(SyncPhase::Migrating);

        let needs_migration = !self.store.flag(keys::MIGRATED_TO_REMOTE);
        if needs_migration {
            self.status.syncing("Uploading local data...");
            match migrate(self.remote.as_ref(), &self.state, &scope).await {
                Ok(()) => self.status.success("Local data uploaded"),
                Err(e) => {
                    tracing::warn!(error = %e, "migration incomplete, not retried");
                    self.status.error(format!("Upload failed: {}", e));
                }
            }
        }

        self.generation += 1;
        let sink = EventSink::new(self.generation, self.events_tx.clone());
        for target in RemoteTarget::ALL {
            let subscription =
                self.remote
                    .subscribe(&scope, target, target.default_order(), sink.clone());
            self.subscriptions.push(subscription);
            self.awaiting_initial.insert(target);
        }

        if needs_migration {
            self.store.set_flag(keys::MIGRATED_TO_REMOTE, true);
        }
        self.set_phase(SyncPhase::Synced);
        if !needs_migration {
            self.status.success("Sync enabled");
        }
    }

    /// Cancels every listener. Local data stays as it is.
    pub fn stop_sync(&mut self) {
        if !self.subscriptions.is_empty() {
            tracing::info!(count = self.subscriptions.len(), "stopping sync");
        }
        self.generation += 1;
        for subscription in self.subscriptions.drain(..) {
            subscription.cancel();
        }
        self.awaiting_initial.clear();
        self.session = None;
        self.set_phase(SyncPhase::LoggedOut);
    }

    fn sync_scope(&self) -> Option<RemoteScope> {
        if self.phase != SyncPhase::Synced {
            return None;
        }
        self.session
            .as_ref()
            .filter(|s| s.sync_enabled)
            .map(RemoteScope::from)
    }

    // ---- remote events -----------------------------------------------------

    /// Applies every event already queued. Returns how many were applied.
    pub fn process_events(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            if self.apply_event(event) {
                applied += 1;
            }
        }
        applied
    }

    /// Waits until every listener has delivered its first snapshot (or
    /// failed). Returns false on timeout.
    pub async fn wait_for_initial_snapshots(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while !self.awaiting_initial.is_empty() {
            match tokio::time::timeout_at(deadline, self.events_rx.recv()).await {
                Ok(Some(event)) => {
                    self.apply_event(event);
                }
                Ok(None) => return false,
                Err(_) => {
                    tracing::warn!(
                        pending = self.awaiting_initial.len(),
                        "timed out waiting for snapshots"
                    );
                    return false;
                }
            }
        }
        true
    }

    fn apply_event(&mut self, event: RemoteEvent) -> bool {
        if event.generation != self.generation || self.phase == SyncPhase::LoggedOut {
            tracing::debug!(listener = %event.target, "discarding stale snapshot");
            return false;
        }
        self.awaiting_initial.remove(&event.target);

        match (event.target, event.payload) {
            (RemoteTarget::Collection(kind), RemotePayload::Collection(docs)) => {
                self.apply_collection(kind, docs);
                true
            }
            (RemoteTarget::Stats, RemotePayload::Document(Some(data))) => {
                match serde_json::from_value::<Stats>(data) {
                    Ok(stats) => {
                        self.state.stats = stats;
                        self.store.save(keys::STATS, &self.state.stats);
                        self.notify(Change::Stats);
                        true
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "ignoring malformed stats document");
                        false
                    }
                }
            }
            (RemoteTarget::Stats, RemotePayload::Document(None)) => false,
            (listener, RemotePayload::Error(message)) => {
                tracing::warn!(%listener, %message, "listener error");
                self.status.error(format!("Sync error: {}", message));
                false
            }
            (listener, _) => {
                tracing::warn!(%listener, "unexpected payload for listener");
                false
            }
        }
    }

    fn apply_collection(&mut self, kind: CollectionKind, docs: Vec<Document>) {
        tracing::debug!(%kind, count = docs.len(), "applying snapshot");
        match kind {
            CollectionKind::Todos => {
                self.state.tasks = decode_all(kind, docs);
                self.state.sort_tasks();
                self.store.save(keys::TODOS, &self.state.tasks);
                self.notify(Change::Tasks);
            }
            CollectionKind::Reminders => {
                self.state.reminders = decode_all(kind, docs);
                self.state.sort_reminders();
                self.store.save(keys::REMINDERS, &self.state.reminders);
                self.notify(Change::Reminders);
            }
            CollectionKind::Notes => {
                self.state.notes = decode_all(kind, docs);
                self.state.sort_notes();
                self.store.save(keys::NOTES, &self.state.notes);
                self.notify(Change::Notes);
            }
        }
    }

    // ---- propagation helpers ----------------------------------------------

    fn propagate_put<T: Entity>(&self, entity: &T) {
        let Some(scope) = self.sync_scope() else {
            return;
        };
        match Document::from_entity(entity) {
            Ok(doc) => self.writer.submit(scope, WriteOp::Put { kind: T::KIND, doc }),
            Err(e) => tracing::warn!(error = %e, "cannot encode entity for remote write"),
        }
    }

    fn propagate_delete(&self, kind: CollectionKind, id: &EntityId) {
        if let Some(scope) = self.sync_scope() {
            self.writer.submit(
                scope,
                WriteOp::Delete {
                    kind,
                    id: id.to_string(),
                },
            );
        }
    }

    fn propagate_stats(&self) {
        if let Some(scope) = self.sync_scope() {
            self.writer.submit(scope, WriteOp::PutStats(self.state.stats));
        }
    }

    fn save_tasks(&mut self) {
        self.store.save(keys::TODOS, &self.state.tasks);
        self.notify(Change::Tasks);
    }

    fn save_stats(&mut self) {
        self.store.save(keys::STATS, &self.state.stats);
        self.propagate_stats();
        self.notify(Change::Stats);
    }

    /// Waits for every queued remote write to finish.
    pub async fn flush(&self) {
        self.writer.flush().await;
    }

    // ---- tasks ---------------------------------------------------------------

    pub fn tasks(&self, filter: TaskFilter, category: Option<Category>) -> Vec<&Task> {
        self.state.visible_tasks(filter, category)
    }

    /// Adds a task at the top of the list. Blank text is ignored.
    pub fn add_task(
        &mut self,
        text: &str,
        category: Category,
        priority: Priority,
        due_date: Option<NaiveDate>,
    ) -> Option<EntityId> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let mut task = Task::new(text)
            .with_category(category)
            .with_priority(priority);
        if let Some(due_date) = due_date {
            task = task.with_due_date(due_date);
        }
        if let Some(top) = self.state.tasks.first() {
            task.rank = task.rank.max(top.effective_rank() + RANK_STEP);
        }

        let id = task.id.clone();
        self.propagate_put(&task);
        self.state.tasks.insert(0, task);
        self.save_tasks();

        self.state.stats.record_task_added();
        self.save_stats();
        Some(id)
    }

    pub fn toggle_task(&mut self, id: &str) -> bool {
        let Some(task) = self.state.tasks.iter_mut().find(|t| t.id == id) else {
            return false;
        };
        task.completed = !task.completed;
        let completed = task.completed;
        let task = task.clone();

        self.propagate_put(&task);
        self.save_tasks();

        self.state.stats.record_completion(completed);
        self.save_stats();
        true
    }

    /// Replaces a task's text. Blank or unchanged text is ignored.
    pub fn edit_task(&mut self, id: &str, text: &str) -> bool {
        let text = text.trim();
        let Some(task) = self.state.tasks.iter_mut().find(|t| t.id == id) else {
            return false;
        };
        if text.is_empty() || task.text == text {
            return false;
        }
        task.text = text.to_string();
        let task = task.clone();

        self.propagate_put(&task);
        self.save_tasks();
        true
    }

    pub fn delete_task(&mut self, id: &str) -> bool {
        let Some(index) = self.state.tasks.iter().position(|t| t.id == id) else {
            return false;
        };
        let task = self.state.tasks.remove(index);

        self.propagate_delete(CollectionKind::Todos, &task.id);
        self.save_tasks();

        self.state.stats.record_task_deleted(task.completed);
        self.save_stats();
        true
    }

    /// Removes all completed tasks. Stats are left alone.
    pub fn clear_completed(&mut self) -> usize {
        let (done, open): (Vec<Task>, Vec<Task>) = std::mem::take(&mut self.state.tasks)
            .into_iter()
            .partition(|t| t.completed);
        self.state.tasks = open;

        if done.is_empty() {
            return 0;
        }
        for task in &done {
            self.propagate_delete(CollectionKind::Todos, &task.id);
        }
        self.save_tasks();
        done.len()
    }

    /// Moves a task to `to_index` in display order.
    ///
    /// Only the moved task is rewritten: it takes a rank between its new
    /// neighbours. When the neighbours' ranks are too close to split, the
    /// whole list is re-ranked and rewritten.
    pub fn move_task(&mut self, id: &str, to_index: usize) -> bool {
        let Some(from) = self.state.tasks.iter().position(|t| t.id == id) else {
            return false;
        };
        let to = to_index.min(self.state.tasks.len() - 1);
        if from == to {
            return false;
        }

        let task = self.state.tasks.remove(from);
        self.state.tasks.insert(to, task);

        let above = to
            .checked_sub(1)
            .map(|i| self.state.tasks[i].effective_rank());
        let below = self.state.tasks.get(to + 1).map(|t| t.effective_rank());
        let rank = match (above, below) {
            (Some(a), Some(b)) => Some(a / 2.0 + b / 2.0).filter(|r| *r < a && *r > b),
            (Some(a), None) => Some(a - RANK_STEP).filter(|r| *r < a),
            (None, Some(b)) => Some(b + RANK_STEP).filter(|r| *r > b),
            (None, None) => None,
        };

        match rank {
            Some(rank) => {
                self.state.tasks[to].rank = rank;
                let task = self.state.tasks[to].clone();
                self.propagate_put(&task);
            }
            None => {
                tracing::debug!("rank precision exhausted, re-ranking all tasks");
                let count = self.state.tasks.len();
                for (i, task) in self.state.tasks.iter_mut().enumerate() {
                    task.rank = (count - i) as f64 * RANK_STEP;
                }
                for task in &self.state.tasks {
                    self.propagate_put(task);
                }
            }
        }

        self.save_tasks();
        true
    }

    pub fn move_task_up(&mut self, id: &str) -> bool {
        match self.state.tasks.iter().position(|t| t.id == id) {
            Some(index) if index > 0 => self.move_task(id, index - 1),
            _ => false,
        }
    }

    pub fn move_task_down(&mut self, id: &str) -> bool {
        match self.state.tasks.iter().position(|t| t.id == id) {
            Some(index) if index + 1 < self.state.tasks.len() => self.move_task(id, index + 1),
            _ => false,
        }
    }

    // ---- reminders -----------------------------------------------------------

    /// Adds a reminder. Blank text is ignored.
    pub fn add_reminder(
        &mut self,
        text: &str,
        time: DateTime<Utc>,
        repeat: Option<RepeatInterval>,
    ) -> Option<EntityId> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let mut reminder = Reminder::new(text, time);
        if let Some(interval) = repeat {
            reminder = reminder.repeating(interval);
        }
        let id = reminder.id.clone();

        self.propagate_put(&reminder);
        self.state.reminders.push(reminder);
        self.state.sort_reminders();
        self.store.save(keys::REMINDERS, &self.state.reminders);
        self.notify(Change::Reminders);
        Some(id)
    }

    pub fn delete_reminder(&mut self, id: &str) -> bool {
        let Some(index) = self.state.reminders.iter().position(|r| r.id == id) else {
            return false;
        };
        let reminder = self.state.reminders.remove(index);

        self.propagate_delete(CollectionKind::Reminders, &reminder.id);
        self.store.save(keys::REMINDERS, &self.state.reminders);
        self.notify(Change::Reminders);
        true
    }

    /// Fires every active reminder due at `now` and returns them as they
    /// were when they fired.
    pub fn check_reminders(&mut self, now: DateTime<Utc>) -> Vec<Reminder> {
        let mut fired = Vec::new();
        for reminder in self.state.reminders.iter_mut().filter(|r| r.is_due(now)) {
            fired.push(reminder.clone());
            reminder.fire();
        }
        if fired.is_empty() {
            return fired;
        }

        for due in &fired {
            if let Some(updated) = self.state.reminder(due.id.as_str()) {
                self.propagate_put(updated);
            }
        }
        self.state.sort_reminders();
        self.store.save(keys::REMINDERS, &self.state.reminders);
        for due in &fired {
            tracing::info!(id = %due.id, text = %due.text, "reminder due");
            self.notify(Change::ReminderDue(due.clone()));
        }
        self.notify(Change::Reminders);
        fired
    }

    // ---- notes -----------------------------------------------------------------

    /// Creates an empty note at the top of the list.
    pub fn add_note(&mut self, title: &str) -> EntityId {
        let note = Note::new(title);
        let id = note.id.clone();

        self.propagate_put(&note);
        self.state.notes.insert(0, note);
        self.store.save(keys::NOTES, &self.state.notes);
        self.notify(Change::Notes);
        id
    }

    /// Saves a note's title and content, refreshing `updatedAt`.
    pub fn save_note(&mut self, id: &str, title: &str, content: &str) -> bool {
        let Some(note) = self.state.notes.iter_mut().find(|n| n.id == id) else {
            return false;
        };
        note.update(title, content);
        let note = note.clone();

        self.propagate_put(&note);
        self.state.sort_notes();
        self.store.save(keys::NOTES, &self.state.notes);
        self.notify(Change::Notes);
        true
    }

    pub fn delete_note(&mut self, id: &str) -> bool {
        let Some(index) = self.state.notes.iter().position(|n| n.id == id) else {
            return false;
        };
        let note = self.state.notes.remove(index);
        self.autosave.discard(&note.id);

        self.propagate_delete(CollectionKind::Notes, &note.id);
        self.store.save(keys::NOTES, &self.state.notes);
        self.notify(Change::Notes);
        true
    }

    /// Records an edit to be saved after [`AUTOSAVE_DELAY`] without further
    /// edits. A pending edit to another note is saved immediately.
    pub fn queue_note_autosave(&mut self, id: EntityId, title: &str, content: &str) {
        let draft = NoteDraft {
            id,
            title: title.to_string(),
            content: content.to_string(),
        };
        if let Some(previous) = self.autosave.queue(draft) {
            self.save_draft(previous);
        }
    }

    pub fn autosave_deadline(&self) -> Option<Instant> {
        self.autosave.deadline()
    }

    /// Saves the pending note edit now. Returns whether one was pending.
    pub fn flush_autosave(&mut self) -> bool {
        match self.autosave.take() {
            Some(draft) => {
                self.save_draft(draft);
                true
            }
            None => false,
        }
    }

    fn autosave_due(&mut self, now: Instant) {
        if let Some(draft) = self.autosave.take_due(now) {
            self.save_draft(draft);
        }
    }

    fn save_draft(&mut self, draft: NoteDraft) {
        if !self.save_note(draft.id.as_str(), &draft.title, &draft.content) {
            tracing::debug!(id = %draft.id, "dropping autosave for missing note");
        }
    }

    // ---- stats and settings ------------------------------------------------------

    /// Counts a finished pomodoro work session.
    pub fn record_pomodoro(&mut self, minutes: u32) {
        self.state.stats.record_pomodoro(minutes);
        self.save_stats();
    }

    /// Recounts task totals and zeroes the pomodoro counters.
    pub fn reset_stats(&mut self) {
        self.state.stats = Stats::reset(&self.state.tasks);
        self.save_stats();
    }

    /// Replaces the local settings. Settings never leave the device.
    pub fn update_settings(&mut self, settings: Settings) {
        self.state.settings = settings;
        self.store.save(keys::SETTINGS, &self.state.settings);
        self.notify(Change::Settings);
    }

    pub fn set_setting(&mut self, key: &str, value: &str) -> Result<(), String> {
        let mut settings = self.state.settings.clone();
        settings.set(key, value)?;
        self.update_settings(settings);
        Ok(())
    }

    // ---- export / import ----------------------------------------------------------

    pub fn export_all(&self) -> ExportDocument {
        ExportDocument::from_state(&self.state)
    }

    /// Replaces the sections present in `doc`, persists them and reloads all
    /// state from the local store. While synced, imported collections are
    /// also written remotely and entities they dropped are deleted there.
    pub fn import_all(&mut self, doc: ImportDocument) {
        let ImportDocument {
            todos,
            reminders,
            notes,
            stats,
            settings,
        } = doc;

        if let Some(todos) = todos {
            self.replace_remote(&self.state.tasks, &todos);
            self.store.save(keys::TODOS, &todos);
        }
        if let Some(reminders) = reminders {
            self.replace_remote(&self.state.reminders, &reminders);
            self.store.save(keys::REMINDERS, &reminders);
        }
        if let Some(notes) = notes {
            self.replace_remote(&self.state.notes, &notes);
            self.store.save(keys::NOTES, &notes);
        }
        if let Some(stats) = stats {
            self.store.save(keys::STATS, &stats);
            if let Some(scope) = self.sync_scope() {
                self.writer.submit(scope, WriteOp::PutStats(stats));
            }
        }
        if let Some(imported) = settings {
            let mut settings = self.state.settings.clone();
            imported.apply(&mut settings);
            self.store.save(keys::SETTINGS, &settings);
        }

        self.reload();
        tracing::info!("import complete");
    }

    fn replace_remote<T: Entity>(&self, current: &[T], incoming: &[T]) {
        let Some(scope) = self.sync_scope() else {
            return;
        };
        let keep: HashSet<&EntityId> = incoming.iter().map(|e| e.id()).collect();
        for stale in current.iter().filter(|e| !keep.contains(e.id())) {
            self.writer.submit(
                scope.clone(),
                WriteOp::Delete {
                    kind: T::KIND,
                    id: stale.id().to_string(),
                },
            );
        }
        for doc in documents(incoming) {
            self.writer.submit(scope.clone(), WriteOp::Put { kind: T::KIND, doc });
        }
    }

    /// Re-reads all state from the local store.
    pub fn reload(&mut self) {
        self.state = AppState::load(&self.store);
        self.notify(Change::Reloaded);
    }

    // ---- event loop ------------------------------------------------------------------

    /// Runs until `shutdown` resolves: follows session changes, applies
    /// snapshots, polls reminders and fires note autosaves. Pending edits
    /// and writes are flushed before returning.
    pub async fn run<F>(mut self, mut sessions: watch::Receiver<Option<Session>>, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let initial = sessions.borrow_and_update().clone();
        self.handle_session(initial).await;

        let mut reminder_poll = tokio::time::interval(REMINDER_POLL_INTERVAL);
        reminder_poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut sessions_open = true;

        loop {
            let autosave_deadline = self.autosave.deadline();
            tokio::select! {
                _ = &mut shutdown => break,
                changed = sessions.changed(), if sessions_open => {
                    if changed.is_err() {
                        sessions_open = false;
                        continue;
                    }
                    let session = sessions.borrow_and_update().clone();
                    self.handle_session(session).await;
                }
                Some(event) = self.events_rx.recv() => {
                    self.apply_event(event);
                }
                _ = reminder_poll.tick() => {
                    self.check_reminders(Utc::now());
                }
                _ = sleep_until(autosave_deadline) => {
                    self.autosave_due(Instant::now());
                }
            }
        }

        self.flush_autosave();
        self.stop_sync();
        self.writer.flush().await;
        tracing::debug!("engine stopped");
    }
}

/// Uploads every non-empty local collection and the stats document.
/// All uploads are attempted; the first failure is returned.
async fn migrate(
    remote: &dyn RemoteStore,
    state: &AppState,
    scope: &RemoteScope,
) -> Result<(), RemoteError> {
    let mut first_error = None;

    let batches = [
        (CollectionKind::Todos, documents(&state.tasks)),
        (CollectionKind::Reminders, documents(&state.reminders)),
        (CollectionKind::Notes, documents(&state.notes)),
    ];
    for (kind, docs) in batches {
        if docs.is_empty() {
            continue;
        }
        let count = docs.len();
        match remote.batch_put(scope, kind, docs).await {
            Ok(()) => tracing::info!(%kind, count, "migrated local collection"),
            Err(e) => {
                tracing::warn!(%kind, error = %e, "collection migration failed");
                first_error.get_or_insert(e);
            }
        }
    }

    if let Err(e) = remote.put_stats(scope, &state.stats).await {
        tracing::warn!(error = %e, "stats migration failed");
        first_error.get_or_insert(e);
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn documents<T: Entity>(entities: &[T]) -> Vec<Document> {
    entities
        .iter()
        .filter_map(|entity| match Document::from_entity(entity) {
            Ok(doc) => Some(doc),
            Err(e) => {
                tracing::warn!(error = %e, "skipping unencodable entity");
                None
            }
        })
        .collect()
}

fn decode_all<T: Entity>(kind: CollectionKind, docs: Vec<Document>) -> Vec<T> {
    docs.into_iter()
        .filter_map(|doc| {
            let id = doc.id.clone();
            match doc.into_entity::<T>() {
                Ok(entity) => Some(entity),
                Err(e) => {
                    tracing::warn!(%kind, %id, error = %e, "skipping malformed remote document");
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests;
