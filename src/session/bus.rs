//! Cross-tab authentication event bus
//!
//! Tabs tell each other about logins and logouts. Two delivery mechanisms sit
//! behind one type and are picked at construction:
//!
//! - [`CrossTabBus::Native`] posts on an in-process [`BroadcastHub`], for tabs
//!   sharing a process.
//! - [`CrossTabBus::StorageRelay`] writes the event under [`AUTH_EVENT_KEY`] in
//!   a shared store, so that the store's change notification reaches tabs in
//!   other processes. Rapid writes may coalesce; the latest one wins.
//!
//! Delivery is at most once per event and subscriber, with no
//! acknowledgement. A tab never receives its own events.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::error::StoreError;
use crate::store::{StoreHandle, TabId};

/// Shared-store key used by the storage relay.
pub const AUTH_EVENT_KEY: &str = "auth-event";

const DEFAULT_BUFFER_SIZE: usize = 64;

/// What happened in the publishing tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthEventKind {
    Login,
    Logout,
}

/// A login or logout notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthEvent {
    #[serde(rename = "type")]
    pub kind: AuthEventKind,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl AuthEvent {
    pub fn now(kind: AuthEventKind) -> Self {
        Self {
            kind,
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

#[derive(Debug, Clone)]
struct Envelope {
    origin: TabId,
    event: AuthEvent,
}

/// In-process broadcast medium shared by every tab of a process.
#[derive(Clone)]
pub struct BroadcastHub {
    sender: broadcast::Sender<Envelope>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Number of live subscriptions across all tabs.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BroadcastHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BroadcastHub")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

/// One tab's endpoint on the cross-tab bus.
#[derive(Debug, Clone)]
pub enum CrossTabBus {
    Native { hub: BroadcastHub, tab: TabId },
    StorageRelay { store: StoreHandle },
}

impl CrossTabBus {
    pub fn native(hub: &BroadcastHub, tab: TabId) -> Self {
        CrossTabBus::Native {
            hub: hub.clone(),
            tab,
        }
    }

    pub fn storage_relay(store: StoreHandle) -> Self {
        CrossTabBus::StorageRelay { store }
    }

    /// Short name of the delivery mechanism, for diagnostics.
    pub fn mechanism(&self) -> &'static str {
        match self {
            CrossTabBus::Native { .. } => "broadcast",
            CrossTabBus::StorageRelay { .. } => "storage-relay",
        }
    }

    /// Tell every other tab about `kind`.
    pub fn publish(&self, kind: AuthEventKind) -> Result<AuthEvent, StoreError> {
        let event = AuthEvent::now(kind);
        match self {
            CrossTabBus::Native { hub, tab } => {
                let delivered = hub
                    .sender
                    .send(Envelope {
                        origin: tab.clone(),
                        event: event.clone(),
                    })
                    .unwrap_or_default();
                log::debug!("Published {:?} to {} subscriptions", kind, delivered);
            }
            CrossTabBus::StorageRelay { store } => {
                let payload = serde_json::to_string(&event)
                    .map_err(|e| StoreError::Io(format!("Failed to encode auth event: {}", e)))?;
                store.set(AUTH_EVENT_KEY, &payload)?;
                log::debug!("Relayed {:?} through shared storage", kind);
            }
        }
        Ok(event)
    }

    /// Invoke `handler` for each event published by another tab.
    ///
    /// Must be called from within a tokio runtime. Events published after
    /// this returns are delivered; dropping the [`Subscription`] stops
    /// delivery without touching other subscribers.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(AuthEvent) + Send + Sync + 'static,
    {
        let task = match self {
            CrossTabBus::Native { hub, tab } => {
                let mut receiver = hub.sender.subscribe();
                let tab = tab.clone();
                tokio::spawn(async move {
                    loop {
                        match receiver.recv().await {
                            Ok(envelope) if envelope.origin == tab => continue,
                            Ok(envelope) => handler(envelope.event),
                            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                                log::debug!("Bus subscriber skipped {} events", skipped);
                            }
                            Err(broadcast::error::RecvError::Closed) => break,
                        }
                    }
                })
            }
            CrossTabBus::StorageRelay { store } => {
                let mut events = store.events();
                tokio::spawn(async move {
                    while let Some(change) = events.recv().await {
                        if change.key != AUTH_EVENT_KEY {
                            continue;
                        }
                        let Some(raw) = change.new_value else {
                            continue;
                        };
                        match serde_json::from_str::<AuthEvent>(&raw) {
                            Ok(event) => handler(event),
                            Err(err) => log::debug!("Ignoring malformed auth event: {}", err),
                        }
                    }
                })
            }
        };
        Subscription { task }
    }
}

/// Live registration on the bus. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    task: JoinHandle<()>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}
