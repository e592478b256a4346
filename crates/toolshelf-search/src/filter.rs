//! Filter and sort engine.
//!
//! [`filter_tools`] is a pure function from a catalog slice and a
//! [`FilterSpec`] to an ordered result list. [`SearchEngine`] wraps it with the
//! analytics reporting that happens at the boundary.

use std::cmp::Ordering;
use std::sync::Arc;

use tracing::{debug, trace};

use toolshelf_core::catalog::newest_first;
use toolshelf_core::{Analytics, AnalyticsEvent, Catalog, FilterSpec, SortKey, Tool};

/// Returns true if `tool` satisfies every constraint in `spec`.
///
/// `needle` is the lowercased text query, `None` for no text constraint.
fn matches(tool: &Tool, spec: &FilterSpec, needle: Option<&str>) -> bool {
    if let Some(needle) = needle {
        if !tool.matches_text(needle) {
            return false;
        }
    }
    if !spec.categories.is_empty() && !spec.categories.contains(&tool.category) {
        return false;
    }
    if !spec.tags.is_empty() && !tool.tags.iter().any(|t| spec.tags.contains(t)) {
        return false;
    }
    spec.active_flags().iter().all(|facet| facet.admits(tool))
}

/// Ordering for `key`. Equal keys compare `Equal` so a stable sort keeps
/// input order.
pub fn compare(a: &Tool, b: &Tool, key: SortKey) -> Ordering {
    match key {
        SortKey::Name => a
            .name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name)),
        SortKey::Stars => b.stars_or_zero().total_cmp(&a.stars_or_zero()),
        SortKey::Newest => newest_first(a, b),
    }
}

/// Stable in-place sort by `key`.
pub fn sort_tools(tools: &mut [Tool], key: SortKey) {
    tools.sort_by(|a, b| compare(a, b, key));
}

/// Apply `spec` to `tools`.
///
/// A blank query imposes no text constraint, so the default specification
/// returns every tool (sorted by name).
pub fn filter_tools(tools: &[Tool], spec: &FilterSpec) -> Vec<Tool> {
    let needle = spec.text_query().map(str::to_lowercase);
    let mut results: Vec<Tool> = tools
        .iter()
        .filter(|tool| matches(tool, spec, needle.as_deref()))
        .cloned()
        .collect();
    sort_tools(&mut results, spec.sort_by);
    trace!(
        input = tools.len(),
        result_count = results.len(),
        sort_by = %spec.sort_by,
        "Filter applied"
    );
    results
}

/// Catalog-bound engine that reports each narrowed query to analytics.
#[derive(Debug, Clone)]
pub struct SearchEngine {
    catalog: Arc<Catalog>,
    analytics: Analytics,
}

impl SearchEngine {
    pub fn new(catalog: Arc<Catalog>, analytics: Analytics) -> Self {
        Self { catalog, analytics }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Run `spec` against the whole catalog.
    ///
    /// Emits one `FilterApplied` event when the specification has a query or
    /// at least one active facet.
    pub fn run(&self, spec: &FilterSpec) -> Vec<Tool> {
        let results = filter_tools(self.catalog.all(), spec);
        if spec.has_active_filters() {
            debug!(
                component = "search",
                active = spec.active_filter_count(),
                result_count = results.len(),
                "Filtered search"
            );
            self.analytics
                .track(AnalyticsEvent::filter_applied(spec, results.len()));
        }
        results
    }

    /// Free-text search over the catalog.
    ///
    /// A blank query returns nothing and reports nothing.
    pub fn search(&self, query: &str) -> Vec<Tool> {
        let results: Vec<Tool> = self.catalog.search(query).into_iter().cloned().collect();
        let query = query.trim();
        if !query.is_empty() {
            debug!(component = "search", query, result_count = results.len(), "Text search");
            self.analytics.track(AnalyticsEvent::Search {
                query: query.to_string(),
                result_count: results.len(),
            });
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolshelf_core::{Category, EventBus, Facet};

    fn ids(tools: &[Tool]) -> Vec<&str> {
        tools.iter().map(|t| t.id.as_str()).collect()
    }

    fn sample() -> Vec<Tool> {
        vec![
            Tool::new("a", "Alpha", Category::Frontend, "2025-04-02")
                .with_tags(["react", "ui"])
                .with_stars(4.9)
                .free(),
            Tool::new("b", "beta", Category::Backend, "2025-03-20")
                .with_tags(["node"])
                .with_stars(4.7)
                .free(),
            Tool::new("c", "Gamma", Category::Backend, "2024-12-01")
                .with_description("A React server toolkit")
                .with_tags(["node", "ssr"])
                .free_tier()
                .featured(),
            Tool::new("d", "Delta", Category::Testing, "2025-05-01")
                .with_stars(4.7)
                .new_release(),
        ]
    }

    #[test]
    fn test_default_spec_returns_everything_sorted_by_name() {
        let result = filter_tools(&sample(), &FilterSpec::default());
        assert_eq!(ids(&result), vec!["a", "b", "d", "c"]);
    }

    #[test]
    fn test_empty_catalog() {
        let spec = FilterSpec::new().with_query("x").free_only(true);
        assert!(filter_tools(&[], &spec).is_empty());
    }

    #[test]
    fn test_blank_query_is_no_constraint() {
        let spec = FilterSpec::new().with_query("   ");
        assert_eq!(filter_tools(&sample(), &spec).len(), 4);
    }

    #[test]
    fn test_query_matches_name_description_and_tags() {
        let spec = FilterSpec::new().with_query("REACT");
        let result = filter_tools(&sample(), &spec);
        assert_eq!(ids(&result), vec!["a", "c"]);
    }

    #[test]
    fn test_query_does_not_match_category() {
        let spec = FilterSpec::new().with_query("testing");
        assert!(filter_tools(&sample(), &spec).is_empty());
    }

    #[test]
    fn test_categories_are_or_within_facet() {
        let spec = FilterSpec::new()
            .with_category(Category::Frontend)
            .with_category(Category::Testing);
        assert_eq!(ids(&filter_tools(&sample(), &spec)), vec!["a", "d"]);
    }

    #[test]
    fn test_tags_are_or_within_facet_and_exact() {
        let spec = FilterSpec::new().with_tag("ui").with_tag("ssr");
        assert_eq!(ids(&filter_tools(&sample(), &spec)), vec!["a", "c"]);

        let partial = FilterSpec::new().with_tag("nod");
        assert!(filter_tools(&sample(), &partial).is_empty());
    }

    #[test]
    fn test_facets_are_and_across() {
        let spec = FilterSpec::new()
            .with_category(Category::Backend)
            .with_tag("node")
            .free_only(true);
        assert_eq!(ids(&filter_tools(&sample(), &spec)), vec!["b"]);
    }

    #[test]
    fn test_each_flag_filters() {
        let tools = sample();
        let cases = [
            (Facet::Free, vec!["a", "b"]),
            (Facet::FreeTier, vec!["c"]),
            (Facet::New, vec!["d"]),
            (Facet::Featured, vec!["c"]),
        ];
        for (facet, expected) in cases {
            let mut spec = FilterSpec::new();
            spec.set_flag(facet, true);
            assert_eq!(ids(&filter_tools(&tools, &spec)), expected, "{:?}", facet);
        }
    }

    #[test]
    fn test_stars_sort_is_stable_and_missing_is_zero() {
        let spec = FilterSpec::new().sorted_by(SortKey::Stars);
        // b and d tie at 4.7 and keep input order; c has no rating
        assert_eq!(ids(&filter_tools(&sample(), &spec)), vec!["a", "b", "d", "c"]);
    }

    #[test]
    fn test_stars_sort_with_nan_ratings_is_total() {
        let mut tools: Vec<Tool> = (0..40)
            .map(|i| {
                let tool = Tool::new(format!("t{}", i), format!("Tool {}", i), Category::Api, "2025-01-01");
                if i % 3 == 0 {
                    tool.with_stars(f64::NAN)
                } else {
                    tool.with_stars((i % 5) as f64)
                }
            })
            .collect();
        sort_tools(&mut tools, SortKey::Stars);

        let ratings: Vec<f64> = tools.iter().map(Tool::stars_or_zero).collect();
        assert!(ratings.windows(2).all(|w| w[0] >= w[1]));
        // NaN ranks with the unrated tools and keeps input order among zeros
        let zeros: Vec<&str> = tools
            .iter()
            .filter(|t| t.stars_or_zero() == 0.0)
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(zeros[..3], ["t0", "t3", "t5"]);
    }

    #[test]
    fn test_newest_sort() {
        let spec = FilterSpec::new().sorted_by(SortKey::Newest);
        assert_eq!(ids(&filter_tools(&sample(), &spec)), vec!["d", "a", "b", "c"]);
    }

    #[test]
    fn test_name_sort_ignores_case() {
        let mut tools = sample();
        sort_tools(&mut tools, SortKey::Name);
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "beta", "Delta", "Gamma"]);
    }

    #[test]
    fn test_engine_reports_only_narrowed_queries() {
        let catalog = Arc::new(Catalog::new(sample()).unwrap());
        let bus = Arc::new(EventBus::new(8));
        let mut rx = bus.subscribe();
        let engine = SearchEngine::new(catalog, Analytics::new(bus.clone()));

        engine.run(&FilterSpec::new().sorted_by(SortKey::Stars));
        assert!(rx.try_recv().is_err());

        let result = engine.run(&FilterSpec::new().with_category(Category::Backend));
        assert_eq!(result.len(), 2);
        let envelope = rx.try_recv().unwrap();
        assert_eq!(envelope.event_name, "filter_apply");
        assert_eq!(envelope.payload.params()["result_count"], 2);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_engine_text_search() {
        let catalog = Arc::new(Catalog::new(sample()).unwrap());
        let bus = Arc::new(EventBus::new(8));
        let mut rx = bus.subscribe();
        let engine = SearchEngine::new(catalog, Analytics::new(bus.clone()));

        assert!(engine.search("  ").is_empty());
        assert!(rx.try_recv().is_err());

        assert_eq!(ids(&engine.search("testing")), vec!["d"]);
        assert_eq!(
            rx.try_recv().unwrap().payload,
            AnalyticsEvent::Search {
                query: "testing".to_string(),
                result_count: 1,
            }
        );
    }
}
