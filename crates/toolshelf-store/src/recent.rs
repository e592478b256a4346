//! Bounded most-recent-first list of search terms.

use tracing::{debug, warn};

use toolshelf_core::defaults;
use toolshelf_core::{Analytics, AnalyticsEvent};

use crate::store::PersistedStore;
use crate::value::PersistedValue;

/// Recent search terms for one tab, shared across tabs through storage.
pub struct RecentSearches {
    terms: PersistedValue<Vec<String>>,
    limit: usize,
    analytics: Analytics,
}

impl RecentSearches {
    pub fn new(store: PersistedStore, limit: usize, analytics: Analytics) -> Self {
        Self {
            terms: PersistedValue::new(store, defaults::RECENT_SEARCHES_KEY, Vec::new()),
            limit,
            analytics,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Record `term` as the most recent search.
    ///
    /// The term is trimmed; blank terms are ignored. An earlier entry equal
    /// ignoring case is moved to the front and takes the new spelling.
    /// Returns true if the stored list changed.
    pub fn record(&mut self, term: &str) -> bool {
        let term = term.trim();
        if term.is_empty() || self.limit == 0 {
            return false;
        }
        self.terms.sync();
        let limit = self.limit;
        let before = self.terms.get().clone();
        let result = self.terms.update(|mut terms| {
            terms.retain(|existing| !same_term(existing, term));
            terms.insert(0, term.to_string());
            terms.truncate(limit);
            terms
        });
        match result {
            Ok(after) => {
                let changed = *after != before;
                if changed {
                    debug!(component = "recent_searches", query = term, "Search recorded");
                }
                changed
            }
            Err(e) => {
                warn!(component = "recent_searches", error = %e, "Failed to record search");
                false
            }
        }
    }

    /// Terms, most recent first.
    pub fn list(&mut self) -> &[String] {
        self.terms.sync();
        self.terms.get()
    }

    /// Remove `term` (case-insensitive). Returns true if it was present.
    pub fn remove(&mut self, term: &str) -> bool {
        self.terms.sync();
        let term = term.trim();
        if !self
            .terms
            .get()
            .iter()
            .any(|existing| same_term(existing, term))
        {
            return false;
        }
        match self.terms.update(|mut terms| {
            terms.retain(|existing| !same_term(existing, term));
            terms
        }) {
            Ok(_) => true,
            Err(e) => {
                warn!(component = "recent_searches", error = %e, "Failed to remove search");
                false
            }
        }
    }

    /// Empty the list. Returns the number of terms removed.
    pub fn clear(&mut self) -> usize {
        self.terms.sync();
        let count = self.terms.get().len();
        if count == 0 {
            return 0;
        }
        if let Err(e) = self.terms.set(Vec::new()) {
            warn!(component = "recent_searches", error = %e, "Failed to clear searches");
            return 0;
        }
        self.analytics
            .track(AnalyticsEvent::RecentSearchesCleared { count });
        count
    }

    /// Apply changes made by other tabs. Returns true if the list changed.
    pub fn sync(&mut self) -> bool {
        self.terms.sync()
    }
}

/// Terms are equal ignoring case, with full Unicode case mapping.
fn same_term(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StorageArea;
    use std::sync::Arc;
    use toolshelf_core::EventBus;

    fn recent(area: &StorageArea, limit: usize) -> RecentSearches {
        RecentSearches::new(area.open_tab(), limit, Analytics::disabled())
    }

    #[test]
    fn test_most_recent_first() {
        let area = StorageArea::in_memory();
        let mut searches = recent(&area, 5);
        searches.record("react");
        searches.record("postgres");
        assert_eq!(searches.list(), &["postgres".to_string(), "react".to_string()]);
    }

    #[test]
    fn test_duplicate_moves_to_front_case_insensitive() {
        let area = StorageArea::in_memory();
        let mut searches = recent(&area, 5);
        searches.record("react");
        searches.record("vite");
        assert!(searches.record("React"));
        assert_eq!(searches.list(), &["React".to_string(), "vite".to_string()]);
    }

    #[test]
    fn test_non_ascii_terms_deduplicated() {
        let area = StorageArea::in_memory();
        let mut searches = recent(&area, 5);
        searches.record("Äpfel");
        searches.record("vite");
        searches.record("äpfel");
        assert_eq!(searches.list(), &["äpfel".to_string(), "vite".to_string()]);
        assert!(searches.remove("ÄPFEL"));
        assert_eq!(searches.list(), &["vite".to_string()]);
    }

    #[test]
    fn test_recording_current_head_is_unchanged() {
        let area = StorageArea::in_memory();
        let mut searches = recent(&area, 5);
        searches.record("react");
        assert!(!searches.record("  react "));
    }

    #[test]
    fn test_bounded_by_limit() {
        let area = StorageArea::in_memory();
        let mut searches = recent(&area, 3);
        for term in ["a", "b", "c", "d"] {
            searches.record(term);
        }
        assert_eq!(
            searches.list(),
            &["d".to_string(), "c".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn test_blank_terms_ignored() {
        let area = StorageArea::in_memory();
        let mut searches = recent(&area, 5);
        assert!(!searches.record(""));
        assert!(!searches.record("   "));
        assert!(searches.list().is_empty());
    }

    #[test]
    fn test_remove() {
        let area = StorageArea::in_memory();
        let mut searches = recent(&area, 5);
        searches.record("react");
        searches.record("vite");
        assert!(searches.remove("REACT"));
        assert!(!searches.remove("react"));
        assert_eq!(searches.list(), &["vite".to_string()]);
    }

    #[test]
    fn test_clear_emits_event() {
        let area = StorageArea::in_memory();
        let bus = Arc::new(EventBus::new(8));
        let mut rx = bus.subscribe();
        let mut searches = RecentSearches::new(area.open_tab(), 5, Analytics::new(bus.clone()));
        searches.record("a");
        searches.record("b");

        assert_eq!(searches.clear(), 2);
        assert_eq!(
            rx.try_recv().unwrap().payload,
            AnalyticsEvent::RecentSearchesCleared { count: 2 }
        );
        assert_eq!(searches.clear(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_shared_across_tabs() {
        let area = StorageArea::in_memory();
        let mut tab_a = recent(&area, 5);
        let mut tab_b = recent(&area, 5);
        tab_a.record("react");
        tab_b.record("vite");
        assert_eq!(tab_a.list(), &["vite".to_string(), "react".to_string()]);
    }
}
