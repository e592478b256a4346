//! Persisted set of bookmarked tool ids.
//!
//! The id sequence lives in storage under [`defaults::BOOKMARKS_KEY`] as a JSON
//! array, in insertion order. The set keeps a membership index and the list
//! of resolved [`Tool`] records, both recomputed whenever the sequence
//! changes. Ids with no catalog entry are left out of the resolved list but
//! stay persisted until removed, cleared, or pruned explicitly.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use toolshelf_core::defaults;
use toolshelf_core::{Analytics, AnalyticsEvent, Catalog, ShelfConfig, Tool, ToolResolver};

use crate::store::PersistedStore;
use crate::value::PersistedValue;

/// Load lifecycle of a [`BookmarkSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookmarkState {
    /// Created, ids not yet resolved.
    Unloaded,
    /// Resolving ids against the catalog.
    Loading,
    /// Resolved list is current.
    Ready,
}

/// Bookmarks for one tab.
pub struct BookmarkSet {
    ids: PersistedValue<Vec<String>>,
    members: HashSet<String>,
    resolved: Vec<Tool>,
    catalog: Arc<Catalog>,
    analytics: Analytics,
    state: BookmarkState,
    prune_on_load: bool,
}

impl BookmarkSet {
    pub fn new(store: PersistedStore, catalog: Arc<Catalog>, analytics: Analytics) -> Self {
        let ids = PersistedValue::new(store, defaults::BOOKMARKS_KEY, Vec::new());
        let mut set = Self {
            ids,
            members: HashSet::new(),
            resolved: Vec::new(),
            catalog,
            analytics,
            state: BookmarkState::Unloaded,
            prune_on_load: defaults::PRUNE_BOOKMARKS,
        };
        set.recompute();
        set
    }

    /// Bookmark set honoring `config.prune_bookmarks`.
    pub fn from_config(
        store: PersistedStore,
        catalog: Arc<Catalog>,
        analytics: Analytics,
        config: &ShelfConfig,
    ) -> Self {
        let mut set = Self::new(store, catalog, analytics);
        set.prune_on_load = config.prune_bookmarks;
        set
    }

    pub fn state(&self) -> BookmarkState {
        self.state
    }

    /// Resolve the persisted ids against the catalog.
    ///
    /// Unloaded → Loading → Ready. Calling it again re-resolves.
    pub async fn load(&mut self) {
        self.state = BookmarkState::Loading;
        self.ids.sync();
        self.resolved = self.catalog.resolve(self.ids.get()).await;
        self.members = self.ids.get().iter().cloned().collect();
        self.state = BookmarkState::Ready;

        let unresolved = self.ids.get().len() - self.resolved.len();
        info!(
            component = "bookmarks",
            saved = self.ids.get().len(),
            unresolved,
            "Bookmarks loaded"
        );
        if self.prune_on_load && unresolved > 0 {
            self.prune_unresolved();
        }
    }

    /// O(1) membership test.
    pub fn is_saved(&self, id: &str) -> bool {
        self.members.contains(id)
    }

    /// Flip membership of `id` and return the new membership state.
    ///
    /// Re-adding appends at the end; removal keeps the order of other ids.
    pub fn toggle(&mut self, id: &str) -> bool {
        self.sync();
        let saved = !self.is_saved(id);
        if self.write_membership(id, saved) {
            self.analytics
                .track(AnalyticsEvent::bookmark(id, self.catalog.get(id), saved));
        }
        self.is_saved(id)
    }

    /// Add `id` if absent. Returns true if the set changed.
    pub fn save(&mut self, id: &str) -> bool {
        self.sync();
        if self.is_saved(id) {
            return false;
        }
        let changed = self.write_membership(id, true);
        if changed {
            self.analytics
                .track(AnalyticsEvent::bookmark(id, self.catalog.get(id), true));
        }
        changed
    }

    /// Remove `id` if present. Returns true if the set changed.
    pub fn remove(&mut self, id: &str) -> bool {
        self.sync();
        if !self.is_saved(id) {
            return false;
        }
        let changed = self.write_membership(id, false);
        if changed {
            self.analytics
                .track(AnalyticsEvent::bookmark(id, self.catalog.get(id), false));
        }
        changed
    }

    /// Remove every bookmark in one write. Returns the number removed.
    pub fn clear_all(&mut self) -> usize {
        self.sync();
        let count = self.ids.get().len();
        if count == 0 {
            return 0;
        }
        if let Err(e) = self.ids.set(Vec::new()) {
            warn!(component = "bookmarks", error = %e, "Failed to clear bookmarks");
            return 0;
        }
        self.recompute();
        self.analytics
            .track(AnalyticsEvent::BookmarksCleared { count });
        count
    }

    /// Drop persisted ids that no longer resolve to a catalog entry.
    /// Returns the number dropped.
    pub fn prune_unresolved(&mut self) -> usize {
        self.sync();
        let catalog = &self.catalog;
        let kept: Vec<String> = self
            .ids
            .get()
            .iter()
            .filter(|id| catalog.contains(id))
            .cloned()
            .collect();
        let dropped = self.ids.get().len() - kept.len();
        if dropped == 0 {
            return 0;
        }
        if let Err(e) = self.ids.set(kept) {
            warn!(component = "bookmarks", error = %e, "Failed to prune bookmarks");
            return 0;
        }
        self.recompute();
        info!(component = "bookmarks", dropped, "Pruned unresolvable bookmarks");
        self.analytics
            .track(AnalyticsEvent::BookmarksPruned { count: dropped });
        dropped
    }

    /// Apply changes made by other tabs. Returns true if the set changed.
    pub fn sync(&mut self) -> bool {
        let changed = self.ids.sync();
        if changed {
            debug!(component = "bookmarks", "Bookmarks replaced by storage change");
            self.recompute();
        }
        changed
    }

    /// Wait for the next storage notification for the bookmark key and apply
    /// it. Returns `None` once storage is gone.
    pub async fn changed(&mut self) -> Option<bool> {
        let changed = self.ids.changed().await?;
        if changed {
            self.recompute();
        }
        Some(changed)
    }

    /// Persisted ids in insertion order, including unresolvable ones.
    pub fn ids(&self) -> &[String] {
        self.ids.get()
    }

    /// Resolved tools in bookmark order.
    pub fn tools(&self) -> &[Tool] {
        &self.resolved
    }

    /// Number of persisted ids.
    pub fn len(&self) -> usize {
        self.ids.get().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.get().is_empty()
    }

    fn write_membership(&mut self, id: &str, saved: bool) -> bool {
        let result = self.ids.update(|mut ids| {
            if saved {
                if !ids.iter().any(|existing| existing == id) {
                    ids.push(id.to_string());
                }
            } else {
                ids.retain(|existing| existing != id);
            }
            ids
        });
        if let Err(e) = result {
            warn!(
                component = "bookmarks",
                tool_id = id,
                error = %e,
                "Failed to persist bookmark change"
            );
            return false;
        }
        self.recompute();
        debug!(component = "bookmarks", tool_id = id, saved, "Bookmark updated");
        true
    }

    fn recompute(&mut self) {
        self.members = self.ids.get().iter().cloned().collect();
        self.resolved = self
            .ids
            .get()
            .iter()
            .filter_map(|id| self.catalog.get(id).cloned())
            .collect();
    }
}
