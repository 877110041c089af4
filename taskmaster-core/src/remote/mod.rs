//! Remote document store abstraction.
//!
//! Data lives under `users/{user_id}/` as three document collections
//! (`todos`, `reminders`, `notes`) plus the single `settings/stats` document.
//! Subscriptions push the full current snapshot immediately and again after
//! every change, as [`RemoteEvent`]s on a channel owned by the caller.
//!
//! ```text
//! SyncEngine
//!     |
//!     v
//! RemoteStore (trait)
//!     |
//!     +---> HttpRemoteStore   (taskmaster-server over REST + WebSocket)
//!     |
//!     +---> MemoryRemoteStore (in-process, tests and offline demos)
//! ```

mod client;
mod error;
mod memory;
mod protocol;

pub use client::{check_server, HttpRemoteStore};
pub(crate) use client::build_http_url;
pub use error::RemoteError;
pub use memory::MemoryRemoteStore;
pub use protocol::{ApiError, BatchRequest, ProtocolMessage};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use tokio::sync::mpsc;

use crate::models::{EntityId, Note, Reminder, Session, Stats, Task};

/// Entity collections mirrored to the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CollectionKind {
    Todos,
    Reminders,
    Notes,
}

impl CollectionKind {
    pub const ALL: [CollectionKind; 3] = [
        CollectionKind::Todos,
        CollectionKind::Reminders,
        CollectionKind::Notes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionKind::Todos => "todos",
            CollectionKind::Reminders => "reminders",
            CollectionKind::Notes => "notes",
        }
    }

    /// Ordering used for this collection's subscription feed.
    pub fn default_order(&self) -> OrderBy {
        match self {
            CollectionKind::Todos => OrderBy::desc("rank"),
            CollectionKind::Reminders => OrderBy::asc("time"),
            CollectionKind::Notes => OrderBy::desc("updatedAt"),
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollectionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todos" => Ok(CollectionKind::Todos),
            "reminders" => Ok(CollectionKind::Reminders),
            "notes" => Ok(CollectionKind::Notes),
            _ => Err(format!(
                "Invalid collection '{}'. Valid options: todos, reminders, notes",
                s
            )),
        }
    }
}

/// What a subscription listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteTarget {
    Collection(CollectionKind),
    /// The `settings/stats` document.
    Stats,
}

impl RemoteTarget {
    pub const ALL: [RemoteTarget; 4] = [
        RemoteTarget::Collection(CollectionKind::Todos),
        RemoteTarget::Collection(CollectionKind::Reminders),
        RemoteTarget::Collection(CollectionKind::Notes),
        RemoteTarget::Stats,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteTarget::Collection(kind) => kind.as_str(),
            RemoteTarget::Stats => "stats",
        }
    }

    pub fn default_order(&self) -> Option<OrderBy> {
        match self {
            RemoteTarget::Collection(kind) => Some(kind.default_order()),
            RemoteTarget::Stats => None,
        }
    }
}

impl fmt::Display for RemoteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RemoteTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stats" => Ok(RemoteTarget::Stats),
            other => other.parse().map(RemoteTarget::Collection),
        }
    }
}

/// Field ordering applied to collection snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    #[serde(default)]
    pub descending: bool,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }

    /// Sorts documents by this ordering. Documents missing the field go last.
    pub fn sort(&self, docs: &mut [Document]) {
        docs.sort_by(|a, b| {
            let ord = match (a.data.get(&self.field), b.data.get(&self.field)) {
                (Some(x), Some(y)) => {
                    let ord = compare_values(x, y);
                    if self.descending {
                        ord.reverse()
                    } else {
                        ord
                    }
                }
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            ord.then_with(|| a.id.cmp(&b.id))
        });
    }
}

// Timestamps may carry different fractional precision, so strings that parse
// as RFC 3339 are compared as instants.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => {
            match (
                chrono::DateTime::parse_from_rfc3339(x),
                chrono::DateTime::parse_from_rfc3339(y),
            ) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => x.cmp(y),
            }
        }
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

/// A remote document: its id within the collection and its JSON body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

impl Document {
    pub fn new(id: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    pub fn from_entity<T: Entity>(entity: &T) -> Result<Self, RemoteError> {
        let data = serde_json::to_value(entity)
            .map_err(|e| RemoteError::InvalidDocument(e.to_string()))?;
        Ok(Self {
            id: entity.id().to_string(),
            data,
        })
    }

    /// Decodes the body, taking the id from the document key when the body
    /// does not carry one.
    pub fn into_entity<T: DeserializeOwned>(self) -> Result<T, serde_json::Error> {
        let mut data = self.data;
        if let Value::Object(map) = &mut data {
            map.entry("id").or_insert(Value::String(self.id));
        }
        serde_json::from_value(data)
    }
}

/// An entity stored in one of the remote collections.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const KIND: CollectionKind;

    fn id(&self) -> &EntityId;
}

impl Entity for Task {
    const KIND: CollectionKind = CollectionKind::Todos;

    fn id(&self) -> &EntityId {
        &self.id
    }
}

impl Entity for Reminder {
    const KIND: CollectionKind = CollectionKind::Reminders;

    fn id(&self) -> &EntityId {
        &self.id
    }
}

impl Entity for Note {
    const KIND: CollectionKind = CollectionKind::Notes;

    fn id(&self) -> &EntityId {
        &self.id
    }
}

/// Whose data an operation addresses, and the credential to present.
#[derive(Clone, PartialEq, Eq)]
pub struct RemoteScope {
    pub user_id: String,
    pub token: String,
}

impl From<&Session> for RemoteScope {
    fn from(session: &Session) -> Self {
        Self {
            user_id: session.user_id.clone(),
            token: session.token.clone(),
        }
    }
}

impl fmt::Debug for RemoteScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteScope")
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RemotePayload {
    /// Full ordered collection.
    Collection(Vec<Document>),
    /// Single document body, `None` when it does not exist.
    Document(Option<Value>),
    /// The listener failed and will deliver nothing further.
    Error(String),
}

/// One push from a subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteEvent {
    /// Subscription epoch the event belongs to.
    pub generation: u64,
    pub target: RemoteTarget,
    pub payload: RemotePayload,
}

/// Where a subscription delivers its events.
#[derive(Debug, Clone)]
pub struct EventSink {
    generation: u64,
    tx: mpsc::UnboundedSender<RemoteEvent>,
}

impl EventSink {
    pub fn new(generation: u64, tx: mpsc::UnboundedSender<RemoteEvent>) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns false once the receiving side is gone.
    pub fn send(&self, target: RemoteTarget, payload: RemotePayload) -> bool {
        self.tx
            .send(RemoteEvent {
                generation: self.generation,
                target,
                payload,
            })
            .is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Cancelable handle for an active subscription. Dropping it cancels too.
pub struct Subscription {
    target: RemoteTarget,
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(target: RemoteTarget, cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            target,
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A handle for a listener that never started.
    pub fn inert(target: RemoteTarget) -> Self {
        Self {
            target,
            cancel: None,
        }
    }

    pub fn target(&self) -> RemoteTarget {
        self.target
    }

    pub fn cancel(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("target", &self.target)
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// Document-collection remote service.
///
/// All writes are idempotent upserts or deletes keyed by document id.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn put(
        &self,
        scope: &RemoteScope,
        kind: CollectionKind,
        doc: Document,
    ) -> Result<(), RemoteError>;

    async fn delete(
        &self,
        scope: &RemoteScope,
        kind: CollectionKind,
        id: &str,
    ) -> Result<(), RemoteError>;

    /// Writes all documents atomically.
    async fn batch_put(
        &self,
        scope: &RemoteScope,
        kind: CollectionKind,
        docs: Vec<Document>,
    ) -> Result<(), RemoteError>;

    async fn put_stats(&self, scope: &RemoteScope, stats: &Stats) -> Result<(), RemoteError>;

    /// Starts a listener. The current snapshot is delivered to `sink` right
    /// away and again after every change until the handle is cancelled.
    /// Listener failures arrive as [`RemotePayload::Error`].
    fn subscribe(
        &self,
        scope: &RemoteScope,
        target: RemoteTarget,
        order: Option<OrderBy>,
        sink: EventSink,
    ) -> Subscription;
}
