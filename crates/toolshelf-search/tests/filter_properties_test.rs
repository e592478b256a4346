/// Behavioral properties of the filter engine and URL codec, checked against
/// the bundled catalog and a small hand-built one.
use std::sync::Arc;
use std::time::Duration;

use toolshelf_search::{
    filter_tools, url_params, Analytics, Catalog, Category, Facet, FilterSpec, MemoryHistory,
    SearchSession, ShelfConfig, SortKey, Tool,
};

fn ids(tools: &[Tool]) -> Vec<&str> {
    tools.iter().map(|t| t.id.as_str()).collect()
}

fn two_tool_catalog() -> Vec<Tool> {
    vec![
        Tool::new("a", "a", Category::Frontend, "2025-04-02")
            .with_tags(["react"])
            .with_stars(4.9)
            .free(),
        Tool::new("b", "b", Category::Backend, "2025-03-20")
            .with_tags(["node"])
            .with_stars(4.7)
            .free(),
    ]
}

#[test]
fn test_end_to_end_example() {
    let tools = two_tool_catalog();

    let by_category = FilterSpec::new().with_category(Category::Frontend);
    assert_eq!(ids(&filter_tools(&tools, &by_category)), vec!["a"]);

    let by_query = FilterSpec::new().with_query("react");
    assert_eq!(ids(&filter_tools(&tools, &by_query)), vec!["a"]);

    let newest = FilterSpec::new().sorted_by(SortKey::Newest);
    assert_eq!(ids(&filter_tools(&tools, &newest)), vec!["a", "b"]);
}

#[test]
fn test_category_and_tag_filters_commute() {
    let catalog = Catalog::bundled().unwrap();
    let categories = [Category::Frontend, Category::Backend, Category::Testing];
    let tags = ["typescript", "javascript", "open-source", "rust"];

    for category in categories {
        for tag in tags {
            let category_only = FilterSpec::new().with_category(category);
            let tag_only = FilterSpec::new().with_tag(tag);

            let c_then_t = filter_tools(&filter_tools(catalog.all(), &category_only), &tag_only);
            let t_then_c = filter_tools(&filter_tools(catalog.all(), &tag_only), &category_only);
            let both = filter_tools(
                catalog.all(),
                &FilterSpec::new().with_category(category).with_tag(tag),
            );

            assert_eq!(ids(&c_then_t), ids(&t_then_c), "{} / {}", category, tag);
            assert_eq!(ids(&c_then_t), ids(&both), "{} / {}", category, tag);
        }
    }
}

#[test]
fn test_stars_sort_preserves_order_of_ties() {
    let tools: Vec<Tool> = ["t1", "t2", "t3", "t4", "t5"]
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let tool = Tool::new(*id, format!("Tool {}", 5 - i), Category::Api, "2025-01-01");
            if i % 2 == 0 {
                tool.with_stars(4.5)
            } else {
                tool
            }
        })
        .collect();

    let sorted = filter_tools(&tools, &FilterSpec::new().sorted_by(SortKey::Stars));
    assert_eq!(ids(&sorted), vec!["t1", "t3", "t5", "t2", "t4"]);
}

#[test]
fn test_empty_query_search_returns_nothing() {
    let catalog = Catalog::bundled().unwrap();
    assert!(catalog.search("").is_empty());
    assert!(catalog.search("   ").is_empty());

    // the filter engine treats the same input as no constraint
    let spec = FilterSpec::new().with_query("   ");
    assert_eq!(filter_tools(catalog.all(), &spec).len(), catalog.len());
}

#[test]
fn test_url_round_trip_preserves_spec() {
    let mut specs = vec![
        FilterSpec::default(),
        FilterSpec::new().with_query("hot reload"),
        FilterSpec::new()
            .with_categories(Category::ALL)
            .sorted_by(SortKey::Newest),
        FilterSpec::new().with_tag("a&b").with_tag("x=y").with_tag("ünïcode"),
    ];
    for facet in Facet::ALL {
        let mut spec = FilterSpec::new().sorted_by(SortKey::Stars);
        spec.set_flag(facet, true);
        specs.push(spec);
    }

    for spec in specs {
        let query = url_params::to_query(&spec);
        let restored = url_params::from_query(&query);
        assert_eq!(restored, spec, "query string: {}", query);
        assert_eq!(restored.active_flags(), spec.active_flags());
    }
}

#[tokio::test(start_paused = true)]
async fn test_session_debounce_against_bundled_catalog() {
    let catalog = Arc::new(Catalog::bundled().unwrap());
    let history = Arc::new(MemoryHistory::new("q=vit"));
    let mut session = SearchSession::with_history(
        catalog,
        Analytics::disabled(),
        &ShelfConfig::default(),
        history.clone(),
    );
    let initial = session.results();
    assert!(initial.iter().any(|t| t.id == "vite"));

    session.set_query("postgres");
    session.toggle_category(Category::Database);
    session.set_sort(SortKey::Stars);
    assert_eq!(session.results(), initial);

    tokio::time::sleep(Duration::from_millis(301)).await;
    assert_eq!(
        history.replacements(),
        vec!["q=postgres&categories=database&sortBy=stars".to_string()]
    );
    assert!(session
        .results()
        .iter()
        .all(|t| t.category == Category::Database));
}
