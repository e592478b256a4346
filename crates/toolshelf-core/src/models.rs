//! Data models for toolshelf.
//!
//! The [`Tool`] record comes from the bundled catalog and is immutable at
//! runtime. [`FilterSpec`] is the fully-specified description of one search
//! context: every field has an explicit default, and the default value matches
//! the whole catalog.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// =============================================================================
// CATEGORY
// =============================================================================

/// Closed set of catalog categories.
///
/// Declaration order is the display order and the ordering used when a set of
/// categories is serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Frontend,
    Backend,
    Database,
    Devops,
    Testing,
    Design,
    Ai,
    Mobile,
    Security,
    Productivity,
    Api,
    Cloud,
}

impl Category {
    /// Every category, in display order.
    pub const ALL: [Category; 12] = [
        Category::Frontend,
        Category::Backend,
        Category::Database,
        Category::Devops,
        Category::Testing,
        Category::Design,
        Category::Ai,
        Category::Mobile,
        Category::Security,
        Category::Productivity,
        Category::Api,
        Category::Cloud,
    ];

    /// Machine name used in storage, URLs and analytics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Frontend => "frontend",
            Self::Backend => "backend",
            Self::Database => "database",
            Self::Devops => "devops",
            Self::Testing => "testing",
            Self::Design => "design",
            Self::Ai => "ai",
            Self::Mobile => "mobile",
            Self::Security => "security",
            Self::Productivity => "productivity",
            Self::Api => "api",
            Self::Cloud => "cloud",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Frontend => "Frontend",
            Self::Backend => "Backend",
            Self::Database => "Databases",
            Self::Devops => "DevOps",
            Self::Testing => "Testing",
            Self::Design => "Design",
            Self::Ai => "AI & ML",
            Self::Mobile => "Mobile",
            Self::Security => "Security",
            Self::Productivity => "Productivity",
            Self::Api => "APIs",
            Self::Cloud => "Cloud",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == lower)
            .ok_or_else(|| format!("Invalid category: {}", s))
    }
}

// =============================================================================
// TOOL
// =============================================================================

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    /// Stable unique identifier, the join key everywhere.
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: Category,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_free: bool,
    #[serde(default)]
    pub has_free_tier: bool,
    #[serde(default)]
    pub is_new: bool,
    #[serde(default)]
    pub is_featured: bool,
    /// Rating used for popularity sorting. Absent is treated as 0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stars: Option<f64>,
    /// Date string, e.g. `2025-04-02`.
    pub last_updated: String,
    /// Ids of tools this one can replace. Only used for similarity scoring.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

impl Tool {
    /// Create a tool with the required fields; flags default to false.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: Category,
        last_updated: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            category,
            tags: Vec::new(),
            is_free: false,
            has_free_tier: false,
            is_new: false,
            is_featured: false,
            stars: None,
            last_updated: last_updated.into(),
            alternatives: Vec::new(),
            website: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_stars(mut self, stars: f64) -> Self {
        self.stars = Some(stars);
        self
    }

    pub fn free(mut self) -> Self {
        self.is_free = true;
        self
    }

    pub fn free_tier(mut self) -> Self {
        self.has_free_tier = true;
        self
    }

    pub fn new_release(mut self) -> Self {
        self.is_new = true;
        self
    }

    pub fn featured(mut self) -> Self {
        self.is_featured = true;
        self
    }

    pub fn with_alternatives<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.alternatives = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Rating with missing and NaN values mapped to 0.
    #[inline]
    pub fn stars_or_zero(&self) -> f64 {
        self.stars.filter(|s| !s.is_nan()).unwrap_or(0.0)
    }

    /// Parsed `last_updated`, or `None` if the string is not a recognizable date.
    pub fn last_updated_at(&self) -> Option<NaiveDateTime> {
        parse_date(&self.last_updated)
    }

    /// Exact tag membership.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Case-insensitive substring match against name, description and tags.
    ///
    /// `needle` must already be lowercased.
    pub fn matches_text(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
            || self.tags.iter().any(|t| t.to_lowercase().contains(needle))
    }

    /// Free or offering a free tier.
    pub fn is_free_or_free_tier(&self) -> bool {
        self.is_free || self.has_free_tier
    }
}

/// Parse a catalog date string.
///
/// Accepts `YYYY-MM-DD`, RFC 3339 timestamps and naive `YYYY-MM-DDTHH:MM:SS`.
pub fn parse_date(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").ok()
}

// =============================================================================
// SORT KEY
// =============================================================================

/// Result ordering for a filter specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Lexicographic ascending by name.
    #[default]
    Name,
    /// Descending by rating, missing ratings count as 0.
    Stars,
    /// Descending by `last_updated`.
    Newest,
}

impl SortKey {
    pub const ALL: [SortKey; 3] = [SortKey::Name, SortKey::Stars, SortKey::Newest];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Stars => "stars",
            Self::Newest => "newest",
        }
    }
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "name" => Ok(Self::Name),
            "stars" => Ok(Self::Stars),
            "newest" => Ok(Self::Newest),
            _ => Err(format!("Invalid sort key: {}", s)),
        }
    }
}

// =============================================================================
// BOOLEAN FACETS
// =============================================================================

/// Independent boolean facet filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facet {
    Free,
    FreeTier,
    New,
    Featured,
}

impl Facet {
    pub const ALL: [Facet; 4] = [Facet::Free, Facet::FreeTier, Facet::New, Facet::Featured];

    /// Query-string parameter carrying this facet.
    pub fn param_name(&self) -> &'static str {
        match self {
            Self::Free => "isFree",
            Self::FreeTier => "hasFreeTier",
            Self::New => "isNew",
            Self::Featured => "isFeatured",
        }
    }

    /// Whether `tool` passes this facet when it is active.
    pub fn admits(&self, tool: &Tool) -> bool {
        match self {
            Self::Free => tool.is_free,
            Self::FreeTier => tool.has_free_tier,
            Self::New => tool.is_new,
            Self::Featured => tool.is_featured,
        }
    }
}

// =============================================================================
// FILTER SPECIFICATION
// =============================================================================

/// Complete filter/sort state for one search context.
///
/// # Matching
///
/// - `query`: case-insensitive substring over name, description, tags;
///   blank means no text constraint
/// - `categories`: OR within the set; empty means any category
/// - `tags`: OR within the set; empty means any tags
/// - flags: AND with everything else; `false` imposes nothing
///
/// # Example
///
/// ```
/// use toolshelf_core::{Category, FilterSpec, SortKey};
///
/// let spec = FilterSpec::new()
///     .with_query("react")
///     .with_category(Category::Frontend)
///     .free_only(true)
///     .sorted_by(SortKey::Stars);
///
/// assert!(spec.has_active_filters());
/// assert_eq!(spec.active_filter_count(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSpec {
    pub query: String,
    pub categories: BTreeSet<Category>,
    pub tags: BTreeSet<String>,
    pub free_only: bool,
    pub free_tier_only: bool,
    pub new_only: bool,
    pub featured_only: bool,
    pub sort_by: SortKey,
}

impl FilterSpec {
    /// Create the default specification (matches the whole catalog).
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // BUILDER METHODS
    // =========================================================================

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.categories.insert(category);
        self
    }

    pub fn with_categories(mut self, categories: impl IntoIterator<Item = Category>) -> Self {
        self.categories.extend(categories);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn free_only(mut self, on: bool) -> Self {
        self.free_only = on;
        self
    }

    pub fn free_tier_only(mut self, on: bool) -> Self {
        self.free_tier_only = on;
        self
    }

    pub fn new_only(mut self, on: bool) -> Self {
        self.new_only = on;
        self
    }

    pub fn featured_only(mut self, on: bool) -> Self {
        self.featured_only = on;
        self
    }

    pub fn sorted_by(mut self, sort_by: SortKey) -> Self {
        self.sort_by = sort_by;
        self
    }

    // =========================================================================
    // MUTATORS
    // =========================================================================

    /// Flip membership of a category. Returns true if it is now selected.
    pub fn toggle_category(&mut self, category: Category) -> bool {
        if self.categories.remove(&category) {
            false
        } else {
            self.categories.insert(category);
            true
        }
    }

    /// Flip membership of a tag. Returns true if it is now selected.
    pub fn toggle_tag(&mut self, tag: &str) -> bool {
        if self.tags.remove(tag) {
            false
        } else {
            self.tags.insert(tag.to_string());
            true
        }
    }

    pub fn set_flag(&mut self, facet: Facet, on: bool) {
        match facet {
            Facet::Free => self.free_only = on,
            Facet::FreeTier => self.free_tier_only = on,
            Facet::New => self.new_only = on,
            Facet::Featured => self.featured_only = on,
        }
    }

    pub fn flag(&self, facet: Facet) -> bool {
        match facet {
            Facet::Free => self.free_only,
            Facet::FreeTier => self.free_tier_only,
            Facet::New => self.new_only,
            Facet::Featured => self.featured_only,
        }
    }

    /// Facets currently switched on, in declaration order.
    pub fn active_flags(&self) -> Vec<Facet> {
        Facet::ALL.into_iter().filter(|f| self.flag(*f)).collect()
    }

    /// Reset every facet and the query, keeping the sort order.
    pub fn clear_filters(&mut self) {
        let sort_by = self.sort_by;
        *self = Self {
            sort_by,
            ..Self::default()
        };
    }

    // =========================================================================
    // INSPECTION
    // =========================================================================

    /// Trimmed query, `None` when blank.
    pub fn text_query(&self) -> Option<&str> {
        let trimmed = self.query.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    /// Number of active constraints (query, category set, tag set, each flag).
    ///
    /// Sort order is not a constraint.
    pub fn active_filter_count(&self) -> usize {
        usize::from(self.text_query().is_some())
            + usize::from(!self.categories.is_empty())
            + usize::from(!self.tags.is_empty())
            + self.active_flags().len()
    }

    /// Returns true if any constraint narrows the catalog.
    pub fn has_active_filters(&self) -> bool {
        self.active_filter_count() > 0
    }

    /// Returns true if this equals the default specification.
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_roundtrip_names() {
        for category in Category::ALL {
            let parsed: Category = category.as_str().parse().unwrap();
            assert_eq!(parsed, category);
        }
    }

    #[test]
    fn test_category_parse_is_case_insensitive() {
        assert_eq!("Frontend".parse::<Category>().unwrap(), Category::Frontend);
        assert_eq!(" AI ".parse::<Category>().unwrap(), Category::Ai);
        assert!("cooking".parse::<Category>().is_err());
    }

    #[test]
    fn test_category_json_is_lowercase() {
        let json = serde_json::to_string(&Category::Devops).unwrap();
        assert_eq!(json, "\"devops\"");
    }

    #[test]
    fn test_tool_deserializes_catalog_shape() {
        let json = r#"{
            "id": "a",
            "name": "Alpha",
            "description": "First tool",
            "category": "frontend",
            "tags": ["react"],
            "isFree": true,
            "stars": 4.9,
            "lastUpdated": "2025-04-02"
        }"#;
        let tool: Tool = serde_json::from_str(json).unwrap();
        assert_eq!(tool.id, "a");
        assert!(tool.is_free);
        assert!(!tool.has_free_tier);
        assert_eq!(tool.stars, Some(4.9));
        assert!(tool.alternatives.is_empty());
    }

    #[test]
    fn test_stars_or_zero() {
        let tool = Tool::new("a", "Alpha", Category::Frontend, "2025-01-01");
        assert_eq!(tool.stars_or_zero(), 0.0);
        assert_eq!(tool.clone().with_stars(f64::NAN).stars_or_zero(), 0.0);
        assert_eq!(tool.with_stars(4.5).stars_or_zero(), 4.5);
    }

    #[test]
    fn test_parse_date_formats() {
        let day = parse_date("2025-04-02").unwrap();
        assert_eq!(day.to_string(), "2025-04-02 00:00:00");

        let stamp = parse_date("2025-04-02T10:30:00Z").unwrap();
        assert!(stamp > day);

        let naive = parse_date("2025-04-02T10:30:00").unwrap();
        assert_eq!(naive, stamp);

        assert!(parse_date("last tuesday").is_none());
        assert!(parse_date("").is_none());
    }

    #[test]
    fn test_matches_text_fields() {
        let tool = Tool::new("a", "Vite", Category::Frontend, "2025-01-01")
            .with_description("Next generation build tool")
            .with_tags(["bundler"]);
        assert!(tool.matches_text("vite"));
        assert!(tool.matches_text("generation"));
        assert!(tool.matches_text("bund"));
        assert!(!tool.matches_text("frontend"));
    }

    #[test]
    fn test_sort_key_parse() {
        assert_eq!("stars".parse::<SortKey>().unwrap(), SortKey::Stars);
        assert_eq!("NEWEST".parse::<SortKey>().unwrap(), SortKey::Newest);
        assert!("rating".parse::<SortKey>().is_err());
        assert_eq!(SortKey::default(), SortKey::Name);
    }

    #[test]
    fn test_default_spec_has_no_filters() {
        let spec = FilterSpec::default();
        assert!(spec.is_default());
        assert!(!spec.has_active_filters());
        assert_eq!(spec.text_query(), None);
    }

    #[test]
    fn test_whitespace_query_is_not_active() {
        let spec = FilterSpec::new().with_query("   ");
        assert!(!spec.has_active_filters());
        assert!(!spec.is_default());
    }

    #[test]
    fn test_sort_is_not_a_filter() {
        let spec = FilterSpec::new().sorted_by(SortKey::Newest);
        assert!(!spec.has_active_filters());
    }

    #[test]
    fn test_toggle_category_and_tag() {
        let mut spec = FilterSpec::new();
        assert!(spec.toggle_category(Category::Backend));
        assert!(spec.categories.contains(&Category::Backend));
        assert!(!spec.toggle_category(Category::Backend));
        assert!(spec.categories.is_empty());

        assert!(spec.toggle_tag("node"));
        assert!(!spec.toggle_tag("node"));
        assert!(spec.tags.is_empty());
    }

    #[test]
    fn test_set_flag_and_active_flags() {
        let mut spec = FilterSpec::new();
        spec.set_flag(Facet::New, true);
        spec.set_flag(Facet::Free, true);
        assert_eq!(spec.active_flags(), vec![Facet::Free, Facet::New]);
        spec.set_flag(Facet::Free, false);
        assert_eq!(spec.active_flags(), vec![Facet::New]);
    }

    #[test]
    fn test_clear_filters_keeps_sort() {
        let mut spec = FilterSpec::new()
            .with_query("db")
            .with_tag("sql")
            .featured_only(true)
            .sorted_by(SortKey::Stars);
        spec.clear_filters();
        assert!(!spec.has_active_filters());
        assert_eq!(spec.sort_by, SortKey::Stars);
    }

    #[test]
    fn test_partial_spec_json_fills_defaults() {
        let spec: FilterSpec = serde_json::from_str(r#"{"query":"react"}"#).unwrap();
        assert_eq!(spec.query, "react");
        assert!(spec.categories.is_empty());
        assert_eq!(spec.sort_by, SortKey::Name);
    }
}
