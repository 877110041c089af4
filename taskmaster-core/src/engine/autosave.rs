use std::time::Duration;
use tokio::time::Instant;

use crate::models::EntityId;

/// Inactivity period after which a note edit is saved.
pub const AUTOSAVE_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteDraft {
    pub id: EntityId,
    pub title: String,
    pub content: String,
}

/// Holds the latest unsaved note edit and when it becomes due.
#[derive(Debug)]
pub(crate) struct Debouncer {
    delay: Duration,
    pending: Option<(NoteDraft, Instant)>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Replaces the pending draft and restarts the timer. A draft for a
    /// different note is handed back so it can be saved right away.
    pub fn queue(&mut self, draft: NoteDraft) -> Option<NoteDraft> {
        let deadline = Instant::now() + self.delay;
        let previous = self.take();
        let superseded = previous.filter(|p| p.id != draft.id);
        self.pending = Some((draft, deadline));
        superseded
    }

    fn pending_id(&self) -> Option<&EntityId> {
        self.pending.as_ref().map(|(draft, _)| &draft.id)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }

    /// Takes the draft if its deadline has passed.
    pub fn take_due(&mut self, now: Instant) -> Option<NoteDraft> {
        match self.deadline() {
            Some(deadline) if deadline <= now => self.take(),
            _ => None,
        }
    }

    pub fn take(&mut self) -> Option<NoteDraft> {
        self.pending.take().map(|(draft, _)| draft)
    }

    /// Drops a pending draft for a note that no longer exists.
    pub fn discard(&mut self, id: &EntityId) {
        if self.pending_id() == Some(id) {
            self.pending = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(id: &str, content: &str) -> NoteDraft {
        NoteDraft {
            id: EntityId::parse(id).unwrap(),
            title: "t".to_string(),
            content: content.to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_requeue_restarts_timer() {
        let mut debouncer = Debouncer::new(AUTOSAVE_DELAY);
        debouncer.queue(draft("1", "a"));
        let first = debouncer.deadline().unwrap();

        tokio::time::advance(Duration::from_millis(600)).await;
        assert!(debouncer.queue(draft("1", "ab")).is_none());
        let second = debouncer.deadline().unwrap();
        assert!(second > first);

        assert!(debouncer.take_due(first).is_none());
        assert_eq!(debouncer.take_due(second).unwrap().content, "ab");
        assert!(debouncer.deadline().is_none());
    }

    #[test]
    fn test_switching_notes_returns_previous_draft() {
        let mut debouncer = Debouncer::new(AUTOSAVE_DELAY);
        debouncer.queue(draft("1", "a"));
        let previous = debouncer.queue(draft("2", "b")).unwrap();
        assert_eq!(previous.content, "a");
    }

    #[test]
    fn test_discard_only_matching_note() {
        let mut debouncer = Debouncer::new(AUTOSAVE_DELAY);
        debouncer.queue(draft("1", "a"));
        debouncer.discard(&EntityId::parse("2").unwrap());
        assert!(debouncer.deadline().is_some());
        debouncer.discard(&EntityId::parse("1").unwrap());
        assert!(debouncer.deadline().is_none());
    }
}
