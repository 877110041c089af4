use super::*;
use crate::remote::MemoryRemoteStore;
use crate::models::Theme;
use crate::status::StatusKind;
use crate::transfer::ImportedSettings;
use chrono::Duration as ChronoDuration;
use serde_json::json;
use std::sync::Mutex;
use tempfile::TempDir;

const USER: &str = "user-1";

struct Harness {
    engine: SyncEngine,
    remote: MemoryRemoteStore,
    store: LocalStore,
    _temp_dir: TempDir,
}

fn harness() -> Harness {
    let temp_dir = TempDir::new().unwrap();
    let store = LocalStore::new(temp_dir.path());
    harness_with(store, temp_dir, MemoryRemoteStore::new())
}

fn harness_with(store: LocalStore, temp_dir: TempDir, remote: MemoryRemoteStore) -> Harness {
    let engine = SyncEngine::new(
        store.clone(),
        Arc::new(remote.clone()),
        StatusReporter::new(),
    );
    Harness {
        engine,
        remote,
        store,
        _temp_dir: temp_dir,
    }
}

fn session() -> Session {
    Session::anonymous(USER, "token-1")
}

impl Harness {
    async fn sign_in(&mut self) {
        self.engine.handle_session(Some(session())).await;
        assert!(
            self.engine
                .wait_for_initial_snapshots(Duration::from_secs(1))
                .await
        );
    }

    /// Lets queued remote writes land and applies the resulting snapshots.
    async fn settle(&mut self) {
        self.engine.flush().await;
        self.engine.process_events();
    }

    fn remote_task_texts(&self) -> Vec<String> {
        self.remote
            .documents(USER, CollectionKind::Todos)
            .into_iter()
            .map(|d| d.data["text"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    fn texts(&self) -> Vec<&str> {
        self.engine
            .state()
            .tasks
            .iter()
            .map(|t| t.text.as_str())
            .collect()
    }

    fn add(&mut self, text: &str) -> EntityId {
        self.engine
            .add_task(text, Category::Work, Priority::Medium, None)
            .unwrap()
    }
}

#[tokio::test]
async fn test_logged_out_writes_stay_local() {
    let mut h = harness();
    h.add("Buy milk");
    h.engine.flush().await;

    assert_eq!(h.engine.phase(), SyncPhase::LoggedOut);
    let saved: Vec<Task> = h.store.load(keys::TODOS);
    assert_eq!(saved.len(), 1);
    assert!(h.remote.documents(USER, CollectionKind::Todos).is_empty());
    assert_eq!(h.engine.state().stats.total_tasks, 1);
}

#[tokio::test]
async fn test_buy_milk_migrates_then_syncs() {
    let mut h = harness();
    h.add("Buy milk");

    h.sign_in().await;
    assert_eq!(h.engine.phase(), SyncPhase::Synced);
    assert!(h.store.flag(keys::MIGRATED_TO_REMOTE));
    assert_eq!(h.remote_task_texts(), vec!["Buy milk"]);
    assert_eq!(h.remote.stats(USER).unwrap()["totalTasks"], 1);
    assert_eq!(h.texts(), vec!["Buy milk"]);

    let id = h.add("Walk dog");
    h.engine.toggle_task(id.as_str());
    h.settle().await;

    assert_eq!(h.remote_task_texts(), vec!["Walk dog", "Buy milk"]);
    let remote_walk = h
        .remote
        .documents(USER, CollectionKind::Todos)
        .into_iter()
        .find(|d| d.id == id.as_str())
        .unwrap();
    assert_eq!(remote_walk.data["completed"], true);
    assert_eq!(h.remote.stats(USER).unwrap()["completedTasks"], 1);
    assert_eq!(h.engine.state().tasks.len(), 2);
}

#[tokio::test]
async fn test_migration_runs_once() {
    let mut h = harness();
    h.add("first");
    h.sign_in().await;
    assert_eq!(h.remote.batch_put_count(), 1);

    h.engine.handle_session(None).await;
    h.add("offline edit");
    h.sign_in().await;

    assert_eq!(h.remote.batch_put_count(), 1);
    // The remote snapshot wins over the edit made while logged out.
    assert_eq!(h.texts(), vec!["first"]);
}

#[tokio::test]
async fn test_partially_failed_migration_is_not_repeated() {
    let mut h = harness();
    h.add("keep me");
    h.remote.set_stats_offline(true);

    h.engine.handle_session(Some(session())).await;
    assert_eq!(h.remote.batch_put_count(), 1);
    assert!(h.store.flag(keys::MIGRATED_TO_REMOTE));
    assert_eq!(
        h.engine.status().current().unwrap().kind,
        StatusKind::Error
    );

    h.engine.handle_session(None).await;
    h.remote.set_stats_offline(false);
    h.sign_in().await;

    assert_eq!(h.remote.batch_put_count(), 1);
    assert_eq!(h.remote_task_texts(), vec!["keep me"]);
}

#[tokio::test]
async fn test_offline_migration_is_not_retried() {
    let mut h = harness();
    h.add("local only");
    h.remote.set_offline(true);

    h.engine.handle_session(Some(session())).await;
    assert!(h.store.flag(keys::MIGRATED_TO_REMOTE));

    h.engine.handle_session(None).await;
    h.remote.set_offline(false);
    h.sign_in().await;

    assert_eq!(h.remote.batch_put_count(), 0);
}

#[tokio::test]
async fn test_empty_collections_are_not_uploaded() {
    let mut h = harness();
    h.sign_in().await;

    assert_eq!(h.remote.batch_put_count(), 0);
    assert!(h.remote.stats(USER).is_some());
    assert!(h.store.flag(keys::MIGRATED_TO_REMOTE));
}

#[tokio::test]
async fn test_remote_snapshot_replaces_local_collection() {
    let mut h = harness();
    h.add("local");
    h.sign_in().await;

    let mut other = Task::new("from another device");
    other.rank = h.engine.state().tasks[0].rank + 1.0;
    h.remote.inject_put(
        USER,
        CollectionKind::Todos,
        Document::from_entity(&other).unwrap(),
    );
    h.engine.process_events();

    assert_eq!(h.texts(), vec!["from another device", "local"]);
    let saved: Vec<Task> = h.store.load(keys::TODOS);
    assert_eq!(saved.len(), 2);

    let local_id = h.engine.state().tasks[1].id.clone();
    h.remote
        .inject_delete(USER, CollectionKind::Todos, local_id.as_str());
    h.engine.process_events();
    assert_eq!(h.texts(), vec!["from another device"]);
}

#[tokio::test]
async fn test_malformed_remote_documents_are_skipped() {
    let mut h = harness();
    h.sign_in().await;

    h.remote.inject_put(
        USER,
        CollectionKind::Notes,
        Document::new("broken", json!({"title": 5})),
    );
    h.remote.inject_put(
        USER,
        CollectionKind::Notes,
        Document::from_entity(&Note::new("fine")).unwrap(),
    );
    h.engine.process_events();

    let titles: Vec<&str> = h
        .engine
        .state()
        .notes
        .iter()
        .map(|n| n.title.as_str())
        .collect();
    assert_eq!(titles, vec!["fine"]);
}

#[tokio::test]
async fn test_missing_stats_document_keeps_local_stats() {
    let mut h = harness();
    h.store.set_flag(keys::MIGRATED_TO_REMOTE, true);
    h.engine.record_pomodoro(25);

    h.sign_in().await;
    assert_eq!(h.engine.state().stats.total_pomodoros, 1);
}

#[tokio::test]
async fn test_events_after_sign_out_are_discarded() {
    let mut h = harness();
    h.sign_in().await;
    let stale = EventSink::new(h.engine.generation, h.engine.events_tx.clone());

    h.engine.handle_session(None).await;
    assert_eq!(h.engine.phase(), SyncPhase::LoggedOut);
    assert_eq!(h.remote.listener_count(), 0);

    let doc = Document::from_entity(&Task::new("late")).unwrap();
    stale.send(
        RemoteTarget::Collection(CollectionKind::Todos),
        RemotePayload::Collection(vec![doc]),
    );
    assert_eq!(h.engine.process_events(), 0);
    assert!(h.engine.state().tasks.is_empty());

    h.remote.inject_put(
        USER,
        CollectionKind::Todos,
        Document::from_entity(&Task::new("from another device")).unwrap(),
    );
    assert_eq!(h.engine.process_events(), 0);
    assert!(h.engine.state().tasks.is_empty());
    let saved: Vec<Task> = h.store.load(keys::TODOS);
    assert!(saved.is_empty());
}

#[tokio::test]
async fn test_account_switch_replaces_listeners() {
    let mut h = harness();
    h.sign_in().await;
    assert_eq!(h.remote.listener_count(), 4);

    let other = Session::with_email("user-2", "b@example.com", "token-2");
    h.engine.handle_session(Some(other)).await;
    assert!(
        h.engine
            .wait_for_initial_snapshots(Duration::from_secs(1))
            .await
    );
    assert_eq!(h.remote.listener_count(), 4);
    assert_eq!(h.engine.session().unwrap().user_id, "user-2");
}

#[tokio::test]
async fn test_sync_disabled_session_stays_local() {
    let mut h = harness();
    let mut local_only = session();
    local_only.sync_enabled = false;

    h.engine.handle_session(Some(local_only)).await;
    assert_eq!(h.engine.phase(), SyncPhase::LoggedOut);
    assert_eq!(h.remote.listener_count(), 0);
}

#[tokio::test]
async fn test_listener_error_surfaces_status() {
    let mut h = harness();
    h.store.set_flag(keys::MIGRATED_TO_REMOTE, true);
    h.remote.set_offline(true);

    h.engine.handle_session(Some(session())).await;
    assert!(
        h.engine
            .wait_for_initial_snapshots(Duration::from_secs(1))
            .await
    );
    let status = h.engine.status().current().unwrap();
    assert_eq!(status.kind, StatusKind::Error);
    assert!(status.message.starts_with("Sync error"));
}

#[tokio::test]
async fn test_add_task_ignores_blank_text() {
    let mut h = harness();
    assert!(h
        .engine
        .add_task("   ", Category::Work, Priority::Low, None)
        .is_none());
    assert!(h.engine.state().tasks.is_empty());
    assert_eq!(h.engine.state().stats.total_tasks, 0);
}

#[tokio::test]
async fn test_new_tasks_go_on_top() {
    let mut h = harness();
    h.add("one");
    h.add("two");
    h.add("three");
    assert_eq!(h.texts(), vec!["three", "two", "one"]);

    let ranks: Vec<f64> = h.engine.state().tasks.iter().map(|t| t.rank).collect();
    assert!(ranks.windows(2).all(|w| w[0] > w[1]));
}

#[tokio::test]
async fn test_toggle_and_delete_track_stats() {
    let mut h = harness();
    let id = h.add("task");
    h.engine.toggle_task(id.as_str());
    assert_eq!(h.engine.state().stats.completed_tasks, 1);

    h.engine.toggle_task(id.as_str());
    assert_eq!(h.engine.state().stats.completed_tasks, 0);

    h.engine.toggle_task(id.as_str());
    assert!(h.engine.delete_task(id.as_str()));
    let stats = h.engine.state().stats;
    assert_eq!(stats.total_tasks, 0);
    assert_eq!(stats.completed_tasks, 0);
    assert!(!h.engine.delete_task(id.as_str()));
}

#[tokio::test]
async fn test_clear_completed_leaves_stats() {
    let mut h = harness();
    h.sign_in().await;
    let done = h.add("done");
    h.add("open");
    h.engine.toggle_task(done.as_str());
    let before = h.engine.state().stats;

    assert_eq!(h.engine.clear_completed(), 1);
    assert_eq!(h.engine.state().stats, before);
    assert_eq!(h.texts(), vec!["open"]);

    h.settle().await;
    assert_eq!(h.remote_task_texts(), vec!["open"]);
    assert_eq!(h.engine.clear_completed(), 0);
}

#[tokio::test]
async fn test_edit_task_ignores_blank_or_same_text() {
    let mut h = harness();
    let id = h.add("original");

    assert!(!h.engine.edit_task(id.as_str(), ""));
    assert!(!h.engine.edit_task(id.as_str(), "original"));
    assert!(h.engine.edit_task(id.as_str(), "  changed "));
    assert_eq!(h.texts(), vec!["changed"]);
}

#[tokio::test]
async fn test_move_task_rewrites_only_the_moved_task() {
    let mut h = harness();
    h.add("c");
    h.add("b");
    h.add("a");
    h.sign_in().await;
    let before: Vec<Document> = h.remote.documents(USER, CollectionKind::Todos);

    let c = h.engine.state().tasks[2].id.clone();
    assert!(h.engine.move_task(c.as_str(), 0));
    assert_eq!(h.texts(), vec!["c", "a", "b"]);

    h.settle().await;
    assert_eq!(h.remote_task_texts(), vec!["c", "a", "b"]);
    assert_eq!(h.texts(), vec!["c", "a", "b"]);

    let after = h.remote.documents(USER, CollectionKind::Todos);
    let unchanged = after
        .iter()
        .filter(|d| before.iter().any(|b| b == *d))
        .count();
    assert_eq!(unchanged, 2);
}

#[tokio::test]
async fn test_move_task_up_and_down() {
    let mut h = harness();
    let low = h.add("low");
    h.add("high");

    assert!(!h.engine.move_task_down(low.as_str()));
    assert!(h.engine.move_task_up(low.as_str()));
    assert_eq!(h.texts(), vec!["low", "high"]);
    assert!(!h.engine.move_task_up(low.as_str()));
    assert!(h.engine.move_task_down(low.as_str()));
    assert_eq!(h.texts(), vec!["high", "low"]);
}

#[tokio::test]
async fn test_move_task_reranks_when_precision_runs_out() {
    let mut h = harness();
    let a = h.add("a");
    let b = h.add("b");
    let c = h.add("c");
    for (id, rank) in [(&c, 3.0), (&b, 2.0), (&a, 2.0 - f64::EPSILON)] {
        let task = h
            .engine
            .state
            .tasks
            .iter_mut()
            .find(|t| &t.id == id)
            .unwrap();
        task.rank = rank;
    }

    // Nothing fits between b and a, so everything is re-ranked.
    assert!(h.engine.move_task(c.as_str(), 1));
    assert_eq!(h.texts(), vec!["b", "c", "a"]);
    let ranks: Vec<f64> = h.engine.state().tasks.iter().map(|t| t.rank).collect();
    assert_eq!(ranks, vec![3.0 * RANK_STEP, 2.0 * RANK_STEP, RANK_STEP]);

    let saved: Vec<Task> = h.store.load(keys::TODOS);
    assert_eq!(saved[0].rank, 3.0 * RANK_STEP);
}

#[tokio::test]
async fn test_rerank_while_synced_writes_each_task() {
    let mut h = harness();
    h.store.set_flag(keys::MIGRATED_TO_REMOTE, true);
    h.sign_in().await;
    let a = h.add("a");
    let b = h.add("b");
    let c = h.add("c");
    h.settle().await;
    for (id, rank) in [(&c, 3.0), (&b, 2.0), (&a, 2.0 - f64::EPSILON)] {
        let task = h
            .engine
            .state
            .tasks
            .iter_mut()
            .find(|t| &t.id == id)
            .unwrap();
        task.rank = rank;
    }

    assert!(h.engine.move_task(c.as_str(), 1));
    h.settle().await;

    assert_eq!(h.remote.batch_put_count(), 0);
    assert_eq!(h.remote_task_texts(), vec!["b", "c", "a"]);
}

#[tokio::test]
async fn test_check_reminders() {
    let mut h = harness();
    let now = Utc::now();
    let once = h
        .engine
        .add_reminder("stretch", now - ChronoDuration::minutes(1), None)
        .unwrap();
    let daily = h
        .engine
        .add_reminder(
            "standup",
            now - ChronoDuration::minutes(2),
            Some(RepeatInterval::Daily),
        )
        .unwrap();
    h.engine
        .add_reminder("later", now + ChronoDuration::hours(1), None);

    let fired = h.engine.check_reminders(now);
    let texts: Vec<&str> = fired.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(texts, vec!["standup", "stretch"]);

    let state = h.engine.state();
    assert!(!state.reminder(once.as_str()).unwrap().active);
    let standup = state.reminder(daily.as_str()).unwrap();
    assert!(standup.active);
    assert_eq!(
        standup.time,
        now - ChronoDuration::minutes(2) + ChronoDuration::days(1)
    );

    assert!(h.engine.check_reminders(now).is_empty());
}

#[tokio::test]
async fn test_reminder_due_notifies_listeners() {
    let mut h = harness();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    h.engine.on_change(move |change, _| {
        if let Change::ReminderDue(reminder) = change {
            sink.lock().unwrap().push(reminder.text.clone());
        }
    });

    let now = Utc::now();
    h.engine.add_reminder("tea", now, None);
    h.engine.check_reminders(now);
    assert_eq!(*seen.lock().unwrap(), vec!["tea".to_string()]);
}

#[tokio::test]
async fn test_delete_reminder() {
    let mut h = harness();
    let id = h
        .engine
        .add_reminder("x", Utc::now(), None)
        .unwrap();
    assert!(h.engine.delete_reminder(id.as_str()));
    assert!(h.engine.state().reminders.is_empty());
    assert!(!h.engine.delete_reminder(id.as_str()));
}

#[tokio::test]
async fn test_notes_save_and_delete() {
    let mut h = harness();
    h.sign_in().await;
    let first = h.engine.add_note("First");
    let second = h.engine.add_note("Second");
    assert_eq!(h.engine.state().notes[0].id, second);

    assert!(h.engine.save_note(first.as_str(), "First", "body"));
    assert_eq!(h.engine.state().notes[0].id, first);

    assert!(h.engine.delete_note(second.as_str()));
    h.settle().await;

    let remote = h.remote.documents(USER, CollectionKind::Notes);
    assert_eq!(remote.len(), 1);
    assert_eq!(remote[0].data["content"], "body");
}

#[tokio::test(start_paused = true)]
async fn test_note_autosave_after_inactivity() {
    let mut h = harness();
    let id = h.engine.add_note("Draft");

    h.engine.queue_note_autosave(id.clone(), "Draft", "a");
    tokio::time::advance(Duration::from_millis(500)).await;
    h.engine.queue_note_autosave(id.clone(), "Draft", "ab");

    let deadline = h.engine.autosave_deadline().unwrap();
    h.engine.autosave_due(deadline - Duration::from_millis(1));
    assert_eq!(h.engine.state().note(id.as_str()).unwrap().content, "");

    h.engine.autosave_due(deadline);
    assert_eq!(h.engine.state().note(id.as_str()).unwrap().content, "ab");
    assert!(h.engine.autosave_deadline().is_none());
}

#[tokio::test]
async fn test_autosave_for_another_note_saves_previous_draft() {
    let mut h = harness();
    let first = h.engine.add_note("one");
    let second = h.engine.add_note("two");

    h.engine.queue_note_autosave(first.clone(), "one", "first body");
    h.engine.queue_note_autosave(second.clone(), "two", "second body");

    assert_eq!(
        h.engine.state().note(first.as_str()).unwrap().content,
        "first body"
    );
    assert!(h.engine.flush_autosave());
    assert_eq!(
        h.engine.state().note(second.as_str()).unwrap().content,
        "second body"
    );
}

#[tokio::test]
async fn test_deleting_note_drops_its_draft() {
    let mut h = harness();
    let id = h.engine.add_note("gone");
    h.engine.queue_note_autosave(id.clone(), "gone", "text");
    h.engine.delete_note(id.as_str());
    assert!(!h.engine.flush_autosave());
}

#[tokio::test]
async fn test_pomodoro_and_reset_stats() {
    let mut h = harness();
    h.sign_in().await;
    let id = h.add("task");
    h.engine.toggle_task(id.as_str());
    h.engine.record_pomodoro(25);
    h.engine.record_pomodoro(25);
    assert_eq!(h.engine.state().stats.total_minutes, 50);

    h.engine.reset_stats();
    let stats = h.engine.state().stats;
    assert_eq!(stats.total_pomodoros, 0);
    assert_eq!(stats.total_tasks, 1);
    assert_eq!(stats.completed_tasks, 1);

    h.settle().await;
    assert_eq!(h.remote.stats(USER).unwrap()["totalPomodoros"], 0);
}

#[tokio::test]
async fn test_settings_stay_local() {
    let mut h = harness();
    h.sign_in().await;
    h.engine.set_setting("theme", "light").unwrap();
    assert!(h.engine.set_setting("nope", "1").is_err());
    h.engine.flush().await;

    assert_eq!(h.engine.state().settings.theme, Theme::Light);
    let saved: Settings = h.store.load(keys::SETTINGS);
    assert_eq!(saved.theme, Theme::Light);
}

#[tokio::test]
async fn test_import_replaces_present_sections() {
    let mut h = harness();
    h.add("old task");
    h.engine.add_note("kept note");

    let doc = ImportDocument {
        todos: Some(vec![Task::new("imported")]),
        settings: Some(ImportedSettings {
            theme: Some("dark".to_string()),
            palette: Some("rose".to_string()),
            opacity: Some(80),
            blur: None,
        }),
        ..Default::default()
    };
    h.engine.import_all(doc);

    assert_eq!(h.texts(), vec!["imported"]);
    assert_eq!(h.engine.state().notes.len(), 1);
    assert_eq!(h.engine.state().settings.palette, "rose");
    assert_eq!(h.engine.state().settings.opacity, 80);
    // Loaded back from disk.
    assert_eq!(AppState::load(&h.store), *h.engine.state());
}

#[tokio::test]
async fn test_import_while_synced_replaces_remote() {
    let mut h = harness();
    h.add("old");
    h.sign_in().await;

    let doc = ImportDocument {
        todos: Some(vec![Task::new("new one"), Task::new("new two")]),
        ..Default::default()
    };
    h.engine.import_all(doc);
    h.settle().await;

    let mut remote = h.remote_task_texts();
    remote.sort();
    assert_eq!(remote, vec!["new one", "new two"]);
    // Only the migration of "old" used a batch write.
    assert_eq!(h.remote.batch_put_count(), 1);
}

#[tokio::test]
async fn test_export_reflects_state() {
    let mut h = harness();
    h.add("exported");
    let doc = h.engine.export_all();
    assert_eq!(doc.todos.len(), 1);
    assert_eq!(doc.stats.total_tasks, 1);
}

#[tokio::test]
async fn test_change_listeners_see_phase_transitions() {
    let mut h = harness();
    let phases = Arc::new(Mutex::new(Vec::new()));
    let sink = phases.clone();
    h.engine.on_change(move |change, _| {
        if let Change::Phase(phase) = change {
            sink.lock().unwrap().push(*phase);
        }
    });

    h.sign_in().await;
    h.engine.handle_session(None).await;
    assert_eq!(
        *phases.lock().unwrap(),
        vec![SyncPhase::Migrating, SyncPhase::Synced, SyncPhase::LoggedOut]
    );
}

#[tokio::test]
async fn test_run_follows_sessions_until_shutdown() {
    let temp_dir = TempDir::new().unwrap();
    let store = LocalStore::new(temp_dir.path());
    let remote = MemoryRemoteStore::new();
    let mut engine = SyncEngine::new(
        store.clone(),
        Arc::new(remote.clone()),
        StatusReporter::new(),
    );
    let id = engine.add_note("before login");
    engine.queue_note_autosave(id, "before login", "unsaved");

    let (session_tx, session_rx) = watch::channel(None);
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let handle = tokio::spawn(engine.run(session_rx, async {
        let _ = stop_rx.await;
    }));

    session_tx.send_replace(Some(session()));
    for _ in 0..50 {
        if remote.listener_count() == 4 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(remote.listener_count(), 4);

    stop_tx.send(()).unwrap();
    handle.await.unwrap();

    assert_eq!(remote.listener_count(), 0);
    let notes: Vec<Note> = store.load(keys::NOTES);
    assert_eq!(notes[0].content, "unsaved");
    assert_eq!(remote.documents(USER, CollectionKind::Notes).len(), 1);
}

#[tokio::test]
async fn test_restart_reloads_local_state() {
    let temp_dir = TempDir::new().unwrap();
    let store = LocalStore::new(temp_dir.path());
    {
        let mut h = harness_with(store.clone(), TempDir::new().unwrap(), MemoryRemoteStore::new());
        h.engine
            .add_task("persisted", Category::Personal, Priority::High, None);
    }
    let h = harness_with(store, temp_dir, MemoryRemoteStore::new());
    assert_eq!(h.texts(), vec!["persisted"]);
    assert_eq!(h.engine.state().tasks[0].priority, Priority::High);
}
