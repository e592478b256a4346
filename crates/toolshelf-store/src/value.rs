//! Typed in-memory mirror of one persisted key.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use toolshelf_core::Result;

use crate::store::{PersistedStore, StorageChange, StorageSubscription};

/// A value backed by one storage key.
///
/// The store stays the single source of truth: writes go to storage first and
/// only then update the mirror, and every notification for the key (from this
/// tab or another) replaces the mirror wholesale.
pub struct PersistedValue<T> {
    store: PersistedStore,
    key: String,
    initial: T,
    value: T,
    subscription: StorageSubscription,
}

impl<T> PersistedValue<T>
where
    T: Serialize + DeserializeOwned + Clone + PartialEq,
{
    /// Bind `key`, seeding storage with `initial` if the key is absent.
    pub fn new(store: PersistedStore, key: impl Into<String>, initial: T) -> Self {
        let key = key.into();
        // Subscribe before reading so no change can slip in between.
        let subscription = store.subscribe(&key);
        let value = store.get(&key, initial.clone());
        Self {
            store,
            key,
            initial,
            value,
            subscription,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn initial(&self) -> &T {
        &self.initial
    }

    /// Current mirrored value.
    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn store(&self) -> &PersistedStore {
        &self.store
    }

    /// Persist `value` and mirror it.
    pub fn set(&mut self, value: T) -> Result<()> {
        self.store.set(&self.key, &value)?;
        self.value = value;
        Ok(())
    }

    /// Read-modify-write against the stored value, not the mirror, so a
    /// not-yet-synced change from another tab is not overwritten blindly.
    pub fn update<F>(&mut self, f: F) -> Result<&T>
    where
        F: FnOnce(T) -> T,
    {
        let next = self.store.update(&self.key, self.initial.clone(), f)?;
        self.value = next;
        Ok(&self.value)
    }

    /// Delete the key and reset the mirror to the initial value.
    pub fn remove(&mut self) -> Result<()> {
        self.store.remove(&self.key)?;
        self.value = self.initial.clone();
        Ok(())
    }

    /// Replace the mirror from a change notification.
    ///
    /// Changes for other keys are ignored. A removal or an unparseable value
    /// resets to the initial value. Returns true if the mirror changed.
    pub fn apply_change(&mut self, change: &StorageChange) -> bool {
        if change.key != self.key {
            return false;
        }
        let next = match change.new_value.as_deref() {
            Some(raw) => match serde_json::from_str(raw) {
                Ok(value) => value,
                Err(e) => {
                    warn!(
                        storage_key = %self.key,
                        error = %e,
                        "Corrupt value in change notification; using initial value"
                    );
                    self.initial.clone()
                }
            },
            None => self.initial.clone(),
        };
        if next == self.value {
            return false;
        }
        debug!(storage_key = %self.key, origin = ?change.origin, "Mirror replaced");
        self.value = next;
        true
    }

    /// Apply every pending notification. Returns true if the mirror changed.
    pub fn sync(&mut self) -> bool {
        let mut changed = false;
        while let Some(change) = self.subscription.try_next() {
            changed |= self.apply_change(&change);
        }
        changed
    }

    /// Wait for the next notification and apply it.
    ///
    /// Returns `None` once the storage area is gone, otherwise whether the
    /// mirror changed.
    pub async fn changed(&mut self) -> Option<bool> {
        let change = self.subscription.next().await?;
        Some(self.apply_change(&change))
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for PersistedValue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistedValue")
            .field("key", &self.key)
            .field("value", &self.value)
            .finish()
    }
}
