//! Persisted key-value store with change notification.
//!
//! A [`StorageArea`] is one browser profile: a [`StorageBackend`] plus a
//! broadcast channel. Each [`PersistedStore`] handle opened on the area plays
//! the role of a tab. Every `set` and `remove` made through any handle is
//! published to every subscriber of that key, the writing tab included, so
//! same-tab and cross-tab writes travel the same notification path.
//!
//! Ordering across tabs is last-write-wins. There is no locking beyond the
//! backend's per-key atomicity.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{debug, warn};
use uuid::Uuid;

use toolshelf_core::defaults;
use toolshelf_core::{Result, StorageBackend};

use crate::backend::MemoryBackend;

/// Identifier of one store handle ("tab").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TabId(Uuid);

impl TabId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for TabId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Notification that the value under `key` changed.
///
/// `new_value` is the authoritative raw JSON (or `None` after removal);
/// receivers replace their mirror with it rather than merging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageChange {
    pub key: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    /// Handle that made the change; `None` when it came from outside this
    /// process or was synthesized after missed notifications.
    pub origin: Option<TabId>,
}

impl StorageChange {
    /// Returns true if `tab` made this change.
    pub fn is_from(&self, tab: TabId) -> bool {
        self.origin == Some(tab)
    }
}

/// One storage profile shared by any number of tabs.
#[derive(Clone)]
pub struct StorageArea {
    backend: Arc<dyn StorageBackend>,
    tx: broadcast::Sender<StorageChange>,
}

impl StorageArea {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        let (tx, _) = broadcast::channel(defaults::STORAGE_EVENT_CAPACITY);
        Self { backend, tx }
    }

    /// Area over a fresh [`MemoryBackend`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// Open a new handle with its own [`TabId`].
    pub fn open_tab(&self) -> PersistedStore {
        let tab_id = TabId::new();
        debug!(tab_id = %tab_id, "Storage tab opened");
        PersistedStore {
            area: self.clone(),
            tab_id,
        }
    }

    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    /// Announce a change that happened outside this process, e.g. another
    /// program rewriting the shared storage file.
    pub fn notify_external(&self, key: &str, old_value: Option<String>, new_value: Option<String>) {
        self.publish(StorageChange {
            key: key.to_string(),
            old_value,
            new_value,
            origin: None,
        });
    }

    fn publish(&self, change: StorageChange) {
        debug!(
            storage_key = %change.key,
            origin = ?change.origin,
            removed = change.new_value.is_none(),
            subscriber_count = self.tx.receiver_count(),
            "Storage change"
        );
        let _ = self.tx.send(change);
    }
}

/// Handle onto a [`StorageArea`] with JSON (de)serialization.
#[derive(Clone)]
pub struct PersistedStore {
    area: StorageArea,
    tab_id: TabId,
}

impl PersistedStore {
    pub fn tab_id(&self) -> TabId {
        self.tab_id
    }

    pub fn area(&self) -> &StorageArea {
        &self.area
    }

    /// Raw stored string. Backend failures are logged and read as absent.
    pub fn get_raw(&self, key: &str) -> Option<String> {
        match self.area.backend.get_item(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(storage_key = key, error = %e, "Storage read failed; treating as absent");
                None
            }
        }
    }

    /// Read and deserialize `key`.
    ///
    /// If the key is absent, `initial` is written to storage first and
    /// returned. Unparseable stored JSON is logged and handled the same way as
    /// an absent key. Seeding does not publish a change.
    pub fn get<T>(&self, key: &str, initial: T) -> T
    where
        T: Serialize + DeserializeOwned,
    {
        if let Some(raw) = self.get_raw(key) {
            match serde_json::from_str(&raw) {
                Ok(value) => return value,
                Err(e) => {
                    warn!(
                        storage_key = key,
                        error = %e,
                        "Corrupt stored value; falling back to initial value"
                    );
                }
            }
        }
        if let Err(e) = self.write(key, &initial) {
            warn!(storage_key = key, error = %e, "Failed to seed initial value");
        }
        initial
    }

    /// Serialize and store `value`, then notify subscribers.
    pub fn set<T>(&self, key: &str, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let (old_value, new_value) = self.write(key, value)?;
        self.area.publish(StorageChange {
            key: key.to_string(),
            old_value,
            new_value: Some(new_value),
            origin: Some(self.tab_id),
        });
        Ok(())
    }

    /// Read-modify-write: `f` receives the current stored value (or
    /// `initial`) and its result is stored and returned.
    pub fn update<T, F>(&self, key: &str, initial: T, f: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(T) -> T,
    {
        let next = f(self.get(key, initial));
        self.set(key, &next)?;
        Ok(next)
    }

    /// Delete `key` and notify subscribers with an empty `new_value`.
    pub fn remove(&self, key: &str) -> Result<()> {
        let old_value = self.get_raw(key);
        self.area.backend.remove_item(key)?;
        self.area.publish(StorageChange {
            key: key.to_string(),
            old_value,
            new_value: None,
            origin: Some(self.tab_id),
        });
        Ok(())
    }

    /// Every stored key.
    pub fn keys(&self) -> Result<Vec<String>> {
        self.area.backend.keys()
    }

    /// Subscribe to changes of `key` made through any handle on this area.
    pub fn subscribe(&self, key: &str) -> StorageSubscription {
        StorageSubscription {
            key: key.to_string(),
            rx: self.area.tx.subscribe(),
            area: self.area.clone(),
        }
    }

    fn write<T>(&self, key: &str, value: &T) -> Result<(Option<String>, String)>
    where
        T: Serialize + ?Sized,
    {
        let json = serde_json::to_string(value)?;
        let old_value = self.get_raw(key);
        self.area.backend.set_item(key, &json)?;
        Ok((old_value, json))
    }
}

/// Stream of changes for one key.
///
/// If the subscriber falls behind the channel capacity, the missed changes
/// collapse into one synthesized change carrying the key's current value.
pub struct StorageSubscription {
    key: String,
    rx: broadcast::Receiver<StorageChange>,
    area: StorageArea,
}

impl StorageSubscription {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Next pending change for this key, without waiting.
    pub fn try_next(&mut self) -> Option<StorageChange> {
        loop {
            match self.rx.try_recv() {
                Ok(change) if change.key == self.key => return Some(change),
                Ok(_) => continue,
                Err(TryRecvError::Lagged(missed)) => return Some(self.resync(missed)),
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    /// Wait for the next change to this key. `None` once the area is gone.
    pub async fn next(&mut self) -> Option<StorageChange> {
        loop {
            match self.rx.recv().await {
                Ok(change) if change.key == self.key => return Some(change),
                Ok(_) => continue,
                Err(RecvError::Lagged(missed)) => return Some(self.resync(missed)),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    fn resync(&self, missed: u64) -> StorageChange {
        warn!(storage_key = %self.key, missed, "Storage subscriber lagged; resyncing");
        let current = match self.area.backend.get_item(&self.key) {
            Ok(value) => value,
            Err(e) => {
                warn!(storage_key = %self.key, error = %e, "Resync read failed");
                None
            }
        };
        StorageChange {
            key: self.key.clone(),
            old_value: None,
            new_value: current,
            origin: None,
        }
    }
}
