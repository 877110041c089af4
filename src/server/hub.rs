//! Change notification fan-out for listener connections.
//!
//! Every successful write broadcasts [`HubEvent::Updated`] on the channel
//! for the written user and target. Listener sockets react by re-reading
//! and pushing a full snapshot, so a lagged receiver loses nothing.

use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};

use taskmaster_core::remote::RemoteTarget;

const CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HubEvent {
    Updated,
}

/// Broadcast channels per user and target.
pub struct SyncHub {
    channels: RwLock<HashMap<(String, RemoteTarget), broadcast::Sender<HubEvent>>>,
}

impl SyncHub {
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
        }
    }

    pub async fn subscribe(
        &self,
        user_id: &str,
        target: RemoteTarget,
    ) -> broadcast::Receiver<HubEvent> {
        let key = (user_id.to_string(), target);
        let mut channels = self.channels.write().await;

        if let Some(sender) = channels.get(&key) {
            sender.subscribe()
        } else {
            let (sender, receiver) = broadcast::channel(CHANNEL_CAPACITY);
            channels.insert(key, sender);
            receiver
        }
    }

    pub async fn broadcast(&self, user_id: &str, target: RemoteTarget) {
        let key = (user_id.to_string(), target);
        let channels = self.channels.read().await;

        if let Some(sender) = channels.get(&key) {
            // No receivers is fine.
            let _ = sender.send(HubEvent::Updated);
        }
    }

    /// Drops every channel. Open listeners see the channel close and hang up.
    pub async fn close_all(&self) -> usize {
        let mut channels = self.channels.write().await;
        let count = channels.len();
        channels.clear();
        count
    }

    /// Drops channels nobody listens to any more.
    pub async fn prune(&self) -> usize {
        let mut channels = self.channels.write().await;
        let before = channels.len();
        channels.retain(|_, sender| sender.receiver_count() > 0);
        before - channels.len()
    }
}

impl Default for SyncHub {
    fn default() -> Self {
        Self::new()
    }
}
