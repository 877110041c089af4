use std::cmp::Ordering;

use crate::local_store::{keys, LocalStore};
use crate::models::{Category, Note, Reminder, Settings, Stats, Task, TaskFilter};

/// Everything the widget shows, owned by the sync engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub tasks: Vec<Task>,
    pub reminders: Vec<Reminder>,
    pub notes: Vec<Note>,
    pub stats: Stats,
    pub settings: Settings,
}

impl AppState {
    /// Reads every collection from the local store, substituting defaults.
    pub fn load(store: &LocalStore) -> Self {
        let mut state = Self {
            tasks: store.load(keys::TODOS),
            reminders: store.load(keys::REMINDERS),
            notes: store.load(keys::NOTES),
            stats: store.load(keys::STATS),
            settings: store.load(keys::SETTINGS),
        };
        state.sort_tasks();
        state.sort_reminders();
        state.sort_notes();
        state
    }

    /// Highest rank first. The sort is stable, so equal ranks keep their
    /// current relative order.
    pub fn sort_tasks(&mut self) {
        self.tasks.sort_by(|a, b| {
            b.effective_rank()
                .partial_cmp(&a.effective_rank())
                .unwrap_or(Ordering::Equal)
        });
    }

    pub fn sort_reminders(&mut self) {
        self.reminders.sort_by_key(|r| r.time);
    }

    pub fn sort_notes(&mut self) {
        self.notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn note(&self, id: &str) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == id)
    }

    pub fn reminder(&self, id: &str) -> Option<&Reminder> {
        self.reminders.iter().find(|r| r.id == id)
    }

    /// Tasks visible under a filter and optional category, in display order.
    pub fn visible_tasks(&self, filter: TaskFilter, category: Option<Category>) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| filter.matches(t))
            .filter(|t| category.map_or(true, |c| t.category == c))
            .collect()
    }
}

/// What changed, passed to listeners registered with
/// [`SyncEngine::on_change`](super::SyncEngine::on_change).
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Tasks,
    Reminders,
    Notes,
    Stats,
    Settings,
    /// The whole state was re-read from the local store.
    Reloaded,
    /// A reminder came due. Carries the reminder as it was when it fired.
    ReminderDue(Reminder),
    Phase(super::SyncPhase),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    #[test]
    fn test_load_empty_store() {
        let temp_dir = TempDir::new().unwrap();
        let state = AppState::load(&LocalStore::new(temp_dir.path()));
        assert_eq!(state, AppState::default());
    }

    #[test]
    fn test_load_sorts_collections() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalStore::new(temp_dir.path());

        let mut older = Task::new("older");
        older.rank = 1.0;
        let mut newer = Task::new("newer");
        newer.rank = 2.0;
        store.save(keys::TODOS, &vec![older, newer]);

        let now = Utc::now();
        let late = Reminder::new("late", now + Duration::hours(2));
        let soon = Reminder::new("soon", now + Duration::hours(1));
        store.save(keys::REMINDERS, &vec![late, soon]);

        let state = AppState::load(&store);
        assert_eq!(state.tasks[0].text, "newer");
        assert_eq!(state.reminders[0].text, "soon");
    }

    #[test]
    fn test_legacy_tasks_order_by_creation() {
        let mut state = AppState::default();
        let mut first = Task::new("first");
        first.rank = 0.0;
        first.created_at = Utc::now() - Duration::minutes(5);
        let mut second = Task::new("second");
        second.rank = 0.0;
        state.tasks = vec![first, second];

        state.sort_tasks();
        assert_eq!(state.tasks[0].text, "second");
    }

    #[test]
    fn test_visible_tasks_filters() {
        let mut state = AppState::default();
        let mut done = Task::new("done").with_category(Category::Personal);
        done.completed = true;
        state.tasks = vec![done, Task::new("open")];

        assert_eq!(state.visible_tasks(TaskFilter::Active, None).len(), 1);
        assert_eq!(state.visible_tasks(TaskFilter::All, None).len(), 2);
        assert_eq!(
            state
                .visible_tasks(TaskFilter::Completed, Some(Category::Personal))
                .len(),
            1
        );
        assert!(state
            .visible_tasks(TaskFilter::All, Some(Category::Office))
            .is_empty());
    }
}
