//! Read-only catalog store and its query functions.
//!
//! The catalog is built once from bundled (or user-supplied) JSON and never
//! mutated afterwards. Every query is a pure function of the tool list; misses
//! are empty results, never errors.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::defaults;
use crate::error::{Error, Result};
use crate::models::{Category, Tool};
use crate::traits::ToolResolver;

const BUNDLED_CATALOG: &str = include_str!("../data/catalog.json");

/// Category selector accepting the `all` wildcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryFilter {
    All,
    Only(Category),
}

impl std::str::FromStr for CategoryFilter {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(Self::All)
        } else {
            s.parse().map(Self::Only)
        }
    }
}

impl From<Category> for CategoryFilter {
    fn from(category: Category) -> Self {
        Self::Only(category)
    }
}

/// Ordering for "newest first": descending by parsed `last_updated`.
///
/// Tools whose date does not parse sort after every dated tool and compare
/// equal among themselves, so a stable sort keeps their input order.
pub fn newest_first(a: &Tool, b: &Tool) -> Ordering {
    match (a.last_updated_at(), b.last_updated_at()) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Immutable, in-memory list of tools in declaration order.
#[derive(Debug, Clone)]
pub struct Catalog {
    tools: Vec<Tool>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Build a catalog, rejecting duplicate ids.
    ///
    /// Unparseable dates and dangling alternative ids are logged but accepted.
    pub fn new(tools: Vec<Tool>) -> Result<Self> {
        let mut index = HashMap::with_capacity(tools.len());
        for (pos, tool) in tools.iter().enumerate() {
            if index.insert(tool.id.clone(), pos).is_some() {
                return Err(Error::DuplicateToolId(tool.id.clone()));
            }
            if tool.last_updated_at().is_none() {
                warn!(
                    tool_id = %tool.id,
                    last_updated = %tool.last_updated,
                    "Unparseable last_updated; tool sorts last by date"
                );
            }
        }

        for tool in &tools {
            for alt in &tool.alternatives {
                if !index.contains_key(alt) {
                    debug!(tool_id = %tool.id, alternative = %alt, "Alternative not in catalog");
                }
            }
        }

        Ok(Self { tools, index })
    }

    /// Parse a JSON array of tools.
    pub fn from_json(json: &str) -> Result<Self> {
        let tools: Vec<Tool> = serde_json::from_str(json)?;
        Self::new(tools)
    }

    /// Load a JSON catalog file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let catalog = Self::from_json(&json)?;
        info!(path = %path.display(), tool_count = catalog.len(), "Catalog loaded");
        Ok(catalog)
    }

    /// The catalog compiled into the binary.
    pub fn bundled() -> Result<Self> {
        Self::from_json(BUNDLED_CATALOG)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Every tool, in declaration order.
    pub fn all(&self) -> &[Tool] {
        &self.tools
    }

    /// Look up a tool by id.
    pub fn get(&self, id: &str) -> Option<&Tool> {
        self.index.get(id).map(|&pos| &self.tools[pos])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Tools in `filter`'s category, or all tools for [`CategoryFilter::All`].
    pub fn by_category(&self, filter: impl Into<CategoryFilter>) -> Vec<&Tool> {
        match filter.into() {
            CategoryFilter::All => self.tools.iter().collect(),
            CategoryFilter::Only(category) => self
                .tools
                .iter()
                .filter(|t| t.category == category)
                .collect(),
        }
    }

    /// Tools carrying `tag`.
    pub fn by_tag(&self, tag: &str) -> Vec<&Tool> {
        self.tools.iter().filter(|t| t.has_tag(tag)).collect()
    }

    /// Featured tools in catalog order, truncated to `limit`.
    pub fn featured(&self, limit: Option<usize>) -> Vec<&Tool> {
        let featured = self.tools.iter().filter(|t| t.is_featured);
        match limit {
            Some(n) => featured.take(n).collect(),
            None => featured.collect(),
        }
    }

    /// Tools flagged new, most recently updated first, truncated to `limit`.
    pub fn newest(&self, limit: Option<usize>) -> Vec<&Tool> {
        let mut newest: Vec<&Tool> = self.tools.iter().filter(|t| t.is_new).collect();
        newest.sort_by(|a, b| newest_first(a, b));
        if let Some(n) = limit {
            newest.truncate(n);
        }
        newest
    }

    /// Tools that are entirely free.
    pub fn free(&self) -> Vec<&Tool> {
        self.tools.iter().filter(|t| t.is_free).collect()
    }

    /// Case-insensitive substring search over name, description, tags and
    /// category.
    ///
    /// A blank query returns no results; callers wanting "no filter" semantics
    /// must use [`Catalog::all`] for that case.
    pub fn search(&self, query: &str) -> Vec<&Tool> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.tools
            .iter()
            .filter(|t| t.matches_text(&needle) || t.category.as_str().contains(&needle))
            .collect()
    }

    /// Tools most similar to `tool`, best first.
    ///
    /// Scoring: same category +3, each shared tag +2, listed as one of
    /// `tool`'s alternatives +5. Every other tool is a candidate, so `limit`
    /// is filled even when few tools score; ties keep catalog order.
    pub fn similar(&self, tool: &Tool, limit: usize) -> Vec<&Tool> {
        let target_tags: HashSet<&str> = tool.tags.iter().map(String::as_str).collect();

        let mut scored: Vec<(u32, &Tool)> = self
            .tools
            .iter()
            .filter(|candidate| candidate.id != tool.id)
            .map(|candidate| {
                let mut score = 0;
                if candidate.category == tool.category {
                    score += defaults::SIMILAR_CATEGORY_SCORE;
                }
                let shared = candidate
                    .tags
                    .iter()
                    .filter(|t| target_tags.contains(t.as_str()))
                    .count() as u32;
                score += shared * defaults::SIMILAR_TAG_SCORE;
                if tool.alternatives.iter().any(|alt| *alt == candidate.id) {
                    score += defaults::SIMILAR_ALTERNATIVE_SCORE;
                }
                (score, candidate)
            })
            .collect();

        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.into_iter().take(limit).map(|(_, t)| t).collect()
    }

    /// Number of tools per category, in category display order.
    pub fn category_counts(&self) -> Vec<(Category, usize)> {
        Category::ALL
            .into_iter()
            .map(|c| (c, self.tools.iter().filter(|t| t.category == c).count()))
            .filter(|(_, n)| *n > 0)
            .collect()
    }

    /// Number of tools per tag, most used first, then alphabetical.
    pub fn tag_counts(&self) -> Vec<(String, usize)> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for tag in self.tools.iter().flat_map(|t| t.tags.iter()) {
            *counts.entry(tag.as_str()).or_insert(0) += 1;
        }
        let mut counts: Vec<(String, usize)> = counts
            .into_iter()
            .map(|(tag, n)| (tag.to_string(), n))
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        counts
    }
}

#[async_trait]
impl ToolResolver for Catalog {
    async fn resolve(&self, ids: &[String]) -> Vec<Tool> {
        ids.iter().filter_map(|id| self.get(id).cloned()).collect()
    }
}
