//! Ordered background writer for remote mutations.
//!
//! The engine never awaits individual writes. Commands are queued on a
//! channel and applied one at a time, in submission order, by a single task.
//! Failures are logged and surfaced through the status reporter, then
//! dropped.

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use crate::models::Stats;
use crate::remote::{CollectionKind, Document, RemoteScope, RemoteStore};
use crate::status::StatusReporter;

#[derive(Debug, Clone)]
pub(crate) enum WriteOp {
    Put { kind: CollectionKind, doc: Document },
    Delete { kind: CollectionKind, id: String },
    PutStats(Stats),
}

impl WriteOp {
    fn describe(&self) -> String {
        match self {
            WriteOp::Put { kind, doc } => format!("put {}/{}", kind, doc.id),
            WriteOp::Delete { kind, id } => format!("delete {}/{}", kind, id),
            WriteOp::PutStats(_) => "put settings/stats".to_string(),
        }
    }
}

enum Command {
    Write { scope: RemoteScope, op: WriteOp },
    Flush(oneshot::Sender<()>),
}

pub(crate) struct RemoteWriter {
    tx: mpsc::UnboundedSender<Command>,
}

impl RemoteWriter {
    /// Spawns the writer task on the current Tokio runtime.
    pub fn spawn(remote: Arc<dyn RemoteStore>, status: StatusReporter) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run(remote, status, rx));
        Self { tx }
    }

    pub fn submit(&self, scope: RemoteScope, op: WriteOp) {
        tracing::trace!(op = %op.describe(), "queue remote write");
        if self.tx.send(Command::Write { scope, op }).is_err() {
            tracing::warn!("remote writer stopped, dropping write");
        }
    }

    /// Waits until every write submitted so far has completed or failed.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Command::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }
}

async fn run(
    remote: Arc<dyn RemoteStore>,
    status: StatusReporter,
    mut rx: mpsc::UnboundedReceiver<Command>,
) {
    while let Some(command) = rx.recv().await {
        let (scope, op) = match command {
            Command::Write { scope, op } => (scope, op),
            Command::Flush(done) => {
                let _ = done.send(());
                continue;
            }
        };

        let label = op.describe();
        let result = match op {
            WriteOp::Put { kind, doc } => remote.put(&scope, kind, doc).await,
            WriteOp::Delete { kind, id } => remote.delete(&scope, kind, &id).await,
            WriteOp::PutStats(stats) => remote.put_stats(&scope, &stats).await,
        };

        match result {
            Ok(()) => tracing::debug!(op = %label, "remote write applied"),
            Err(e) => {
                tracing::warn!(op = %label, error = %e, "remote write failed");
                status.error(format!("Sync error: {}", e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryRemoteStore;
    use crate::status::StatusKind;
    use serde_json::json;

    fn scope() -> RemoteScope {
        RemoteScope {
            user_id: "u1".to_string(),
            token: "t".to_string(),
        }
    }

    #[tokio::test]
    async fn test_writes_apply_in_order() {
        let remote = MemoryRemoteStore::new();
        let writer = RemoteWriter::spawn(Arc::new(remote.clone()), StatusReporter::new());

        writer.submit(
            scope(),
            WriteOp::Put {
                kind: CollectionKind::Todos,
                doc: Document::new("1", json!({"text": "a"})),
            },
        );
        writer.submit(
            scope(),
            WriteOp::Delete {
                kind: CollectionKind::Todos,
                id: "1".to_string(),
            },
        );
        writer.submit(
            scope(),
            WriteOp::Put {
                kind: CollectionKind::Todos,
                doc: Document::new("1", json!({"text": "b"})),
            },
        );
        writer.flush().await;

        let docs = remote.documents("u1", CollectionKind::Todos);
        assert_eq!(docs, vec![Document::new("1", json!({"text": "b"}))]);
    }

    #[tokio::test]
    async fn test_failure_surfaces_status() {
        let remote = MemoryRemoteStore::new();
        remote.set_offline(true);
        let status = StatusReporter::new();
        let writer = RemoteWriter::spawn(Arc::new(remote), status.clone());

        writer.submit(scope(), WriteOp::PutStats(Stats::default()));
        writer.flush().await;

        let shown = status.current().unwrap();
        assert_eq!(shown.kind, StatusKind::Error);
        assert!(shown.message.starts_with("Sync error"));
    }
}
