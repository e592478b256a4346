//! Query-string codec for [`FilterSpec`].
//!
//! Parameters, in the order they are written:
//!
//! | Name          | Value                                   |
//! |---------------|-----------------------------------------|
//! | `q`           | text query                              |
//! | `categories`  | comma-joined category names             |
//! | `tags`        | comma-joined tags                       |
//! | `isFree`      | `true` or absent                        |
//! | `hasFreeTier` | `true` or absent                        |
//! | `isNew`       | `true` or absent                        |
//! | `isFeatured`  | `true` or absent                        |
//! | `sortBy`      | `name`, `stars` or `newest`             |
//!
//! Defaults are omitted, so the default specification encodes to an empty
//! string. Parsing never fails: unknown parameters, unknown categories and
//! invalid sort keys are skipped with a warning.

use tracing::{debug, warn};

use toolshelf_core::{Category, Facet, FilterSpec, SortKey};

pub const PARAM_QUERY: &str = "q";
pub const PARAM_CATEGORIES: &str = "categories";
pub const PARAM_TAGS: &str = "tags";
pub const PARAM_SORT: &str = "sortBy";

const LIST_SEPARATOR: char = ',';

/// Serialize `spec` into a query string without the leading `?`.
pub fn to_query(spec: &FilterSpec) -> String {
    let mut params: Vec<(&str, String)> = Vec::new();

    if let Some(query) = spec.text_query() {
        params.push((PARAM_QUERY, encode(query)));
    }
    if !spec.categories.is_empty() {
        params.push((PARAM_CATEGORIES, join(spec.categories.iter().map(|c| c.as_str()))));
    }
    if !spec.tags.is_empty() {
        params.push((PARAM_TAGS, join(spec.tags.iter().map(String::as_str))));
    }
    for facet in spec.active_flags() {
        params.push((facet.param_name(), "true".to_string()));
    }
    if spec.sort_by != SortKey::default() {
        params.push((PARAM_SORT, spec.sort_by.as_str().to_string()));
    }

    params
        .into_iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("&")
}

/// Parse a query string (with or without the leading `?`) into a
/// specification. Anything unrecognized is left at its default.
pub fn from_query(query: &str) -> FilterSpec {
    let pairs = parse_pairs(query);
    let mut spec = FilterSpec::default();

    if let Some(q) = first(&pairs, PARAM_QUERY) {
        spec.query = q.to_string();
    }

    if let Some(raw) = first(&pairs, PARAM_CATEGORIES) {
        for name in split(raw) {
            match name.parse::<Category>() {
                Ok(category) => {
                    spec.categories.insert(category);
                }
                Err(_) => warn!(param = PARAM_CATEGORIES, value = name, "Ignoring unknown category"),
            }
        }
    }

    if let Some(raw) = first(&pairs, PARAM_TAGS) {
        spec.tags.extend(split(raw).map(str::to_string));
    }

    for facet in Facet::ALL {
        match first(&pairs, facet.param_name()) {
            Some("true") => spec.set_flag(facet, true),
            Some(other) => debug!(param = facet.param_name(), value = other, "Flag not set"),
            None => {}
        }
    }

    if let Some(raw) = first(&pairs, PARAM_SORT) {
        match raw.parse::<SortKey>() {
            Ok(sort_by) => spec.sort_by = sort_by,
            Err(_) => warn!(param = PARAM_SORT, value = raw, "Ignoring invalid sort key"),
        }
    }

    spec
}

fn encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

fn join<'a>(values: impl Iterator<Item = &'a str>) -> String {
    values.map(encode).collect::<Vec<_>>().join(",")
}

fn split(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(LIST_SEPARATOR)
        .map(str::trim)
        .filter(|item| !item.is_empty())
}

/// Decoded `name=value` pairs in order of appearance.
fn parse_pairs(query: &str) -> Vec<(String, String)> {
    query
        .trim_start_matches('?')
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            Some((decode(name)?, decode(value)?))
        })
        .collect()
}

fn decode(raw: &str) -> Option<String> {
    let raw = raw.replace('+', " ");
    match urlencoding::decode(&raw) {
        Ok(decoded) => Some(decoded.into_owned()),
        Err(e) => {
            warn!(value = %raw, error = %e, "Ignoring undecodable query parameter");
            None
        }
    }
}

/// First value for `name`, matching browser `URLSearchParams::get`.
fn first<'a>(pairs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_spec_encodes_empty() {
        assert_eq!(to_query(&FilterSpec::default()), "");
        assert_eq!(from_query(""), FilterSpec::default());
        assert_eq!(from_query("?"), FilterSpec::default());
    }

    #[test]
    fn test_parameter_order_and_values() {
        let spec = FilterSpec::new()
            .with_query("state management")
            .with_category(Category::Mobile)
            .with_category(Category::Frontend)
            .with_tag("ui")
            .with_tag("react")
            .free_only(true)
            .featured_only(true)
            .sorted_by(SortKey::Stars);

        assert_eq!(
            to_query(&spec),
            "q=state%20management&categories=frontend,mobile&tags=react,ui\
             &isFree=true&isFeatured=true&sortBy=stars"
        );
    }

    #[test]
    fn test_round_trip() {
        let spec = FilterSpec::new()
            .with_query("c++ & friends")
            .with_category(Category::Devops)
            .with_tag("ci/cd")
            .with_tag("100% free")
            .free_tier_only(true)
            .new_only(true)
            .sorted_by(SortKey::Newest);
        assert_eq!(from_query(&to_query(&spec)), spec);
    }

    #[test]
    fn test_browser_style_encoding_is_accepted() {
        let spec = from_query("?q=react+hooks&categories=frontend%2Cbackend&isNew=true");
        assert_eq!(spec.query, "react hooks");
        assert!(spec.categories.contains(&Category::Frontend));
        assert!(spec.categories.contains(&Category::Backend));
        assert!(spec.new_only);
    }

    #[test]
    fn test_invalid_values_are_ignored() {
        let spec = from_query("sortBy=rating&categories=frontend,nonsense&isFree=yes&isNew=TRUE&foo=bar");
        assert_eq!(spec.sort_by, SortKey::Name);
        assert_eq!(spec.categories.len(), 1);
        assert!(!spec.free_only);
        assert!(!spec.new_only);
    }

    #[test]
    fn test_empty_list_items_skipped() {
        let spec = from_query("tags=,ui,,node,");
        let tags: Vec<&str> = spec.tags.iter().map(String::as_str).collect();
        assert_eq!(tags, vec!["node", "ui"]);
    }

    #[test]
    fn test_first_value_wins() {
        let spec = from_query("sortBy=stars&sortBy=newest");
        assert_eq!(spec.sort_by, SortKey::Stars);
    }

    #[test]
    fn test_blank_query_omitted() {
        let spec = FilterSpec::new().with_query("   ").with_tag("ui");
        assert_eq!(to_query(&spec), "tags=ui");
    }
}
