//! In-process remote store.
//!
//! Behaves like the real service from the engine's point of view: writes
//! are upserts keyed by id, and every write pushes a fresh snapshot to the
//! affected listeners. It can also simulate an outage and edits made by
//! another device.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use super::{
    CollectionKind, Document, EventSink, OrderBy, RemoteError, RemotePayload, RemoteScope,
    RemoteStore, RemoteTarget, Subscription,
};
use crate::models::Stats;

#[derive(Clone, Default)]
pub struct MemoryRemoteStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    users: HashMap<String, UserData>,
    listeners: HashMap<u64, Listener>,
    next_listener: u64,
    offline: bool,
    stats_offline: bool,
    batch_writes: usize,
}

#[derive(Default)]
struct UserData {
    collections: HashMap<CollectionKind, BTreeMap<String, Value>>,
    stats: Option<Value>,
}

struct Listener {
    user_id: String,
    target: RemoteTarget,
    order: Option<OrderBy>,
    sink: EventSink,
}

impl Inner {
    fn check_online(&self) -> Result<(), RemoteError> {
        if self.offline {
            Err(RemoteError::Unavailable("network unreachable".to_string()))
        } else {
            Ok(())
        }
    }

    fn user(&mut self, user_id: &str) -> &mut UserData {
        self.users.entry(user_id.to_string()).or_default()
    }

    fn snapshot(&self, user_id: &str, target: RemoteTarget, order: Option<&OrderBy>) -> RemotePayload {
        let user = self.users.get(user_id);
        match target {
            RemoteTarget::Collection(kind) => {
                let mut docs: Vec<Document> = user
                    .and_then(|u| u.collections.get(&kind))
                    .map(|c| {
                        c.iter()
                            .map(|(id, data)| Document::new(id.clone(), data.clone()))
                            .collect()
                    })
                    .unwrap_or_default();
                let order = order.cloned().unwrap_or_else(|| kind.default_order());
                order.sort(&mut docs);
                RemotePayload::Collection(docs)
            }
            RemoteTarget::Stats => RemotePayload::Document(user.and_then(|u| u.stats.clone())),
        }
    }

    /// Pushes the current snapshot to every listener on `target`.
    fn notify(&mut self, user_id: &str, target: RemoteTarget) {
        let mut closed = Vec::new();
        for (key, listener) in &self.listeners {
            if listener.user_id != user_id || listener.target != target {
                continue;
            }
            let payload = self.snapshot(user_id, target, listener.order.as_ref());
            if !listener.sink.send(target, payload) {
                closed.push(*key);
            }
        }
        for key in closed {
            self.listeners.remove(&key);
        }
    }
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Makes every subsequent write fail and new listeners error out.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Makes only stats writes fail.
    pub fn set_stats_offline(&self, offline: bool) {
        self.lock().stats_offline = offline;
    }

    /// Documents currently stored for a user, in the collection's default order.
    pub fn documents(&self, user_id: &str, kind: CollectionKind) -> Vec<Document> {
        match self.lock().snapshot(user_id, RemoteTarget::Collection(kind), None) {
            RemotePayload::Collection(docs) => docs,
            _ => Vec::new(),
        }
    }

    pub fn stats(&self, user_id: &str) -> Option<Value> {
        self.lock().users.get(user_id).and_then(|u| u.stats.clone())
    }

    /// Number of successful batch writes.
    pub fn batch_put_count(&self) -> usize {
        self.lock().batch_writes
    }

    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    /// Writes a document as another device would, ignoring the outage switch.
    pub fn inject_put(&self, user_id: &str, kind: CollectionKind, doc: Document) {
        let mut inner = self.lock();
        inner
            .user(user_id)
            .collections
            .entry(kind)
            .or_default()
            .insert(doc.id, doc.data);
        inner.notify(user_id, RemoteTarget::Collection(kind));
    }

    pub fn inject_delete(&self, user_id: &str, kind: CollectionKind, id: &str) {
        let mut inner = self.lock();
        if let Some(collection) = inner.user(user_id).collections.get_mut(&kind) {
            collection.remove(id);
        }
        inner.notify(user_id, RemoteTarget::Collection(kind));
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn put(
        &self,
        scope: &RemoteScope,
        kind: CollectionKind,
        doc: Document,
    ) -> Result<(), RemoteError> {
        let mut inner = self.lock();
        inner.check_online()?;
        inner
            .user(&scope.user_id)
            .collections
            .entry(kind)
            .or_default()
            .insert(doc.id, doc.data);
        inner.notify(&scope.user_id, RemoteTarget::Collection(kind));
        Ok(())
    }

    async fn delete(
        &self,
        scope: &RemoteScope,
        kind: CollectionKind,
        id: &str,
    ) -> Result<(), RemoteError> {
        let mut inner = self.lock();
        inner.check_online()?;
        if let Some(collection) = inner.user(&scope.user_id).collections.get_mut(&kind) {
            collection.remove(id);
        }
        inner.notify(&scope.user_id, RemoteTarget::Collection(kind));
        Ok(())
    }

    async fn batch_put(
        &self,
        scope: &RemoteScope,
        kind: CollectionKind,
        docs: Vec<Document>,
    ) -> Result<(), RemoteError> {
        let mut inner = self.lock();
        inner.check_online()?;
        let collection = inner.user(&scope.user_id).collections.entry(kind).or_default();
        for doc in docs {
            collection.insert(doc.id, doc.data);
        }
        inner.batch_writes += 1;
        inner.notify(&scope.user_id, RemoteTarget::Collection(kind));
        Ok(())
    }

    async fn put_stats(&self, scope: &RemoteScope, stats: &Stats) -> Result<(), RemoteError> {
        let data = serde_json::to_value(stats)
            .map_err(|e| RemoteError::InvalidDocument(e.to_string()))?;
        let mut inner = self.lock();
        inner.check_online()?;
        if inner.stats_offline {
            return Err(RemoteError::Unavailable("stats write rejected".to_string()));
        }
        inner.user(&scope.user_id).stats = Some(data);
        inner.notify(&scope.user_id, RemoteTarget::Stats);
        Ok(())
    }

    fn subscribe(
        &self,
        scope: &RemoteScope,
        target: RemoteTarget,
        order: Option<OrderBy>,
        sink: EventSink,
    ) -> Subscription {
        let mut inner = self.lock();
        if let Err(e) = inner.check_online() {
            sink.send(target, RemotePayload::Error(e.to_string()));
            return Subscription::inert(target);
        }

        let payload = inner.snapshot(&scope.user_id, target, order.as_ref());
        sink.send(target, payload);

        let key = inner.next_listener;
        inner.next_listener += 1;
        inner.listeners.insert(
            key,
            Listener {
                user_id: scope.user_id.clone(),
                target,
                order,
                sink,
            },
        );

        let registry = Arc::downgrade(&self.inner);
        Subscription::new(target, move || {
            if let Some(inner) = registry.upgrade() {
                let mut inner = inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                inner.listeners.remove(&key);
            }
        })
    }
}
