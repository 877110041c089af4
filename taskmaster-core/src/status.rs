//! Transient sync status shown to the user.
//!
//! Success messages hide after 2 seconds and errors after 3; a syncing
//! message stays until something replaces it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

pub const SUCCESS_HIDE_AFTER: Duration = Duration::from_secs(2);
pub const ERROR_HIDE_AFTER: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Syncing,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub kind: StatusKind,
    pub message: String,
}

impl Status {
    pub fn hide_after(&self) -> Option<Duration> {
        match self.kind {
            StatusKind::Syncing => None,
            StatusKind::Success => Some(SUCCESS_HIDE_AFTER),
            StatusKind::Error => Some(ERROR_HIDE_AFTER),
        }
    }
}

/// Shared handle any component can push status through.
#[derive(Clone)]
pub struct StatusReporter {
    tx: Arc<watch::Sender<Option<Status>>>,
    shown: Arc<AtomicU64>,
}

impl Default for StatusReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusReporter {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            tx: Arc::new(tx),
            shown: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Status>> {
        self.tx.subscribe()
    }

    /// The status currently visible, if any.
    pub fn current(&self) -> Option<Status> {
        self.tx.borrow().clone()
    }

    pub fn syncing(&self, message: impl Into<String>) {
        self.show(StatusKind::Syncing, message.into());
    }

    pub fn success(&self, message: impl Into<String>) {
        self.show(StatusKind::Success, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.show(StatusKind::Error, message.into());
    }

    pub fn hide(&self) {
        self.shown.fetch_add(1, Ordering::SeqCst);
        self.tx.send_replace(None);
    }

    fn show(&self, kind: StatusKind, message: String) {
        match kind {
            StatusKind::Error => tracing::warn!(%message, "sync status"),
            _ => tracing::debug!(?kind, %message, "sync status"),
        }

        let status = Status { kind, message };
        let hide_after = status.hide_after();
        let shown = self.shown.fetch_add(1, Ordering::SeqCst) + 1;
        self.tx.send_replace(Some(status));

        let Some(delay) = hide_after else {
            return;
        };
        // Without a runtime the status simply stays until replaced.
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };

        let tx = self.tx.clone();
        let counter = self.shown.clone();
        handle.spawn(async move {
            tokio::time::sleep(delay).await;
            if counter.load(Ordering::SeqCst) == shown {
                tx.send_replace(None);
            }
        });
    }
}
