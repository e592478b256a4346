//! Debounced search session.
//!
//! A [`SearchSession`] keeps three things consistent: the current
//! [`FilterSpec`], the displayed result list and the URL query string. Every
//! change to the specification restarts the debounce window; when the window
//! elapses the results are recomputed from the specification as it is *then*,
//! the URL is replaced in place and one analytics event is reported.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use toolshelf_core::{
    Analytics, Catalog, Category, Facet, FilterSpec, LocationHistory, ShelfConfig, SortKey, Tool,
};

use crate::debounce::Debouncer;
use crate::filter::SearchEngine;
use crate::url_params;

/// In-memory URL bar. Replacements are recorded; no entries are ever pushed.
#[derive(Debug, Default)]
pub struct MemoryHistory {
    current: Mutex<String>,
    replacements: Mutex<Vec<String>>,
}

impl MemoryHistory {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            current: Mutex::new(query.into()),
            replacements: Mutex::new(Vec::new()),
        }
    }

    /// Every query written through `replace_query`, oldest first.
    pub fn replacements(&self) -> Vec<String> {
        lock(&self.replacements).clone()
    }
}

impl LocationHistory for MemoryHistory {
    fn query(&self) -> String {
        lock(&self.current).clone()
    }

    fn replace_query(&self, query: &str) {
        *lock(&self.current) = query.to_string();
        lock(&self.replacements).push(query.to_string());
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
struct SessionState {
    spec: FilterSpec,
    results: Vec<Tool>,
    recomputations: usize,
}

/// Everything the debounced task needs, shared with the session.
struct SessionShared {
    engine: SearchEngine,
    history: Option<Arc<dyn LocationHistory>>,
    url_sync: bool,
    state: Mutex<SessionState>,
}

impl SessionShared {
    fn recompute(&self) {
        let spec = lock(&self.state).spec.clone();
        let results = self.engine.run(&spec);
        let result_count = results.len();
        {
            let mut state = lock(&self.state);
            state.results = results;
            state.recomputations += 1;
        }
        if self.url_sync {
            if let Some(history) = &self.history {
                let query = url_params::to_query(&spec);
                history.replace_query(&query);
                debug!(component = "search_session", %query, "URL replaced");
            }
        }
        debug!(component = "search_session", result_count, "Results recomputed");
    }
}

/// One search context: a specification, its results and its URL.
///
/// Mutators must be called from within a tokio runtime.
pub struct SearchSession {
    shared: Arc<SessionShared>,
    debouncer: Debouncer,
}

impl SearchSession {
    /// Start a session with no URL bar.
    pub fn new(catalog: Arc<Catalog>, analytics: Analytics, config: &ShelfConfig) -> Self {
        Self::build(catalog, analytics, config, None)
    }

    /// Start a session bound to `history`.
    ///
    /// When `config.url_sync` is on, the initial specification is hydrated
    /// from the current query string. Initial results are computed at once
    /// and reported like any other filter run; the URL is left as it is.
    pub fn with_history(
        catalog: Arc<Catalog>,
        analytics: Analytics,
        config: &ShelfConfig,
        history: Arc<dyn LocationHistory>,
    ) -> Self {
        Self::build(catalog, analytics, config, Some(history))
    }

    fn build(
        catalog: Arc<Catalog>,
        analytics: Analytics,
        config: &ShelfConfig,
        history: Option<Arc<dyn LocationHistory>>,
    ) -> Self {
        let spec = match (&history, config.url_sync) {
            (Some(history), true) => url_params::from_query(&history.query()),
            _ => FilterSpec::default(),
        };
        let engine = SearchEngine::new(catalog, analytics);
        let results = engine.run(&spec);
        info!(
            component = "search_session",
            url_sync = config.url_sync,
            debounce_ms = config.debounce_ms,
            active = spec.active_filter_count(),
            result_count = results.len(),
            "Search session started"
        );
        Self {
            shared: Arc::new(SessionShared {
                engine,
                history,
                url_sync: config.url_sync,
                state: Mutex::new(SessionState {
                    spec,
                    results,
                    recomputations: 0,
                }),
            }),
            debouncer: Debouncer::new(config.debounce()),
        }
    }

    /// Current specification, which may be ahead of [`results`](Self::results).
    pub fn spec(&self) -> FilterSpec {
        lock(&self.shared.state).spec.clone()
    }

    /// Displayed results, as of the last recomputation.
    pub fn results(&self) -> Vec<Tool> {
        lock(&self.shared.state).results.clone()
    }

    /// Number of debounced recomputations that have run.
    pub fn recomputations(&self) -> usize {
        lock(&self.shared.state).recomputations
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        self.shared.engine.catalog()
    }

    /// Replace the specification.
    pub fn set_spec(&mut self, spec: FilterSpec) {
        self.update_spec(|current| *current = spec);
    }

    /// Edit the specification in place. An edit that leaves it unchanged
    /// does not restart the debounce window.
    pub fn update_spec<F>(&mut self, f: F)
    where
        F: FnOnce(&mut FilterSpec),
    {
        let changed = {
            let mut state = lock(&self.shared.state);
            let before = state.spec.clone();
            f(&mut state.spec);
            state.spec != before
        };
        if changed {
            let shared = Arc::clone(&self.shared);
            self.debouncer.schedule(move || shared.recompute());
        }
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        let query = query.into();
        self.update_spec(|spec| spec.query = query);
    }

    /// Returns true if `category` is now selected.
    pub fn toggle_category(&mut self, category: Category) -> bool {
        let mut selected = false;
        self.update_spec(|spec| selected = spec.toggle_category(category));
        selected
    }

    /// Returns true if `tag` is now selected.
    pub fn toggle_tag(&mut self, tag: &str) -> bool {
        let mut selected = false;
        self.update_spec(|spec| selected = spec.toggle_tag(tag));
        selected
    }

    pub fn set_flag(&mut self, facet: Facet, on: bool) {
        self.update_spec(|spec| spec.set_flag(facet, on));
    }

    pub fn set_sort(&mut self, sort_by: SortKey) {
        self.update_spec(|spec| spec.sort_by = sort_by);
    }

    /// Reset query and facets, keeping the sort order.
    pub fn clear_filters(&mut self) {
        self.update_spec(FilterSpec::clear_filters);
    }

    /// Returns true while a recomputation is waiting for the window to close.
    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Run a pending recomputation now. Returns true if one was pending.
    pub fn flush(&mut self) -> bool {
        if self.debouncer.cancel() {
            self.shared.recompute();
            true
        } else {
            false
        }
    }

    /// Categories present in the catalog with their tool counts.
    pub fn available_categories(&self) -> Vec<(Category, usize)> {
        self.catalog().category_counts()
    }

    /// Tags present in the catalog with their tool counts, most used first.
    pub fn available_tags(&self) -> Vec<(String, usize)> {
        self.catalog().tag_counts()
    }
}

impl std::fmt::Debug for SearchSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchSession")
            .field("spec", &self.spec())
            .field("url_sync", &self.shared.url_sync)
            .field("debouncer", &self.debouncer)
            .finish()
    }
}
