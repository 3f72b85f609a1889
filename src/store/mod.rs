//! Shared key-value store used for cross-tab relays and session markers
//!
//! A store is shared by every tab; each tab talks to it through a
//! [`StoreHandle`] tagged with its [`TabId`]. Writes produce [`StorageEvent`]s
//! that are delivered to every *other* tab, and only when the value actually
//! changed.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;

use crate::error::StoreError;

pub mod sqlite;

pub use sqlite::SqliteStore;

type Result<T> = std::result::Result<T, StoreError>;

/// Buffer size for change notifications. Slow tabs skip older events.
const EVENT_BUFFER_SIZE: usize = 256;

/// Identity of one tab (one session context).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TabId(String);

impl TabId {
    /// Allocate an identifier unique across processes sharing a store.
    pub fn generate() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        let n = NEXT.fetch_add(1, Ordering::Relaxed);
        Self(format!("{}-{}", std::process::id(), n))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for TabId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Change notification for a single key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    pub old_value: Option<String>,
    /// `None` when the key was removed
    pub new_value: Option<String>,
    /// Tab that made the change
    pub origin: TabId,
}

impl StorageEvent {
    pub fn is_removal(&self) -> bool {
        self.new_value.is_none()
    }
}

/// Backend of a shared store.
pub trait SharedStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, origin: &TabId, key: &str, value: &str) -> Result<()>;

    fn remove(&self, origin: &TabId, key: &str) -> Result<()>;

    /// Receive every change, from every tab.
    fn watch(&self) -> broadcast::Receiver<StorageEvent>;
}

/// One tab's view of a shared store.
#[derive(Clone)]
pub struct StoreHandle {
    store: Arc<dyn SharedStore>,
    tab: TabId,
}

impl StoreHandle {
    pub fn new(store: Arc<dyn SharedStore>, tab: TabId) -> Self {
        Self { store, tab }
    }

    pub fn tab(&self) -> &TabId {
        &self.tab
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        self.store.get(key)
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.store.set(&self.tab, key, value)
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        self.store.remove(&self.tab, key)
    }

    /// Changes made by other tabs, from now on.
    pub fn events(&self) -> StorageEvents {
        StorageEvents {
            receiver: self.store.watch(),
            tab: self.tab.clone(),
        }
    }
}

impl fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreHandle").field("tab", &self.tab).finish()
    }
}

/// Stream of changes made by other tabs.
pub struct StorageEvents {
    receiver: broadcast::Receiver<StorageEvent>,
    tab: TabId,
}

impl StorageEvents {
    /// Next change from another tab, or `None` once the store is gone.
    pub async fn recv(&mut self) -> Option<StorageEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.origin == self.tab => continue,
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::debug!("Storage watcher for tab {} skipped {} events", self.tab, skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// In-process shared store.
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    sender: broadcast::Sender<StorageEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_BUFFER_SIZE);
        Self {
            entries: Mutex::new(HashMap::new()),
            sender,
        }
    }

    /// Create a store wrapped in an Arc for sharing between tabs.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn notify(&self, event: StorageEvent) {
        // No receivers is fine: nobody is listening yet.
        let _ = self.sender.send(event);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, origin: &TabId, key: &str, value: &str) -> Result<()> {
        let old_value = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            entries.insert(key.to_string(), value.to_string())
        };

        if old_value.as_deref() != Some(value) {
            self.notify(StorageEvent {
                key: key.to_string(),
                old_value,
                new_value: Some(value.to_string()),
                origin: origin.clone(),
            });
        }
        Ok(())
    }

    fn remove(&self, origin: &TabId, key: &str) -> Result<()> {
        let old_value = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            entries.remove(key)
        };

        if old_value.is_some() {
            self.notify(StorageEvent {
                key: key.to_string(),
                old_value,
                new_value: None,
                origin: origin.clone(),
            });
        }
        Ok(())
    }

    fn watch(&self) -> broadcast::Receiver<StorageEvent> {
        self.sender.subscribe()
    }
}
