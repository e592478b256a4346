//! Centralized default constants for toolshelf.
//!
//! **This module is the single source of truth** for shared default values.
//! Crates and the CLI reference these constants instead of defining their own
//! magic numbers.

// =============================================================================
// SEARCH SESSION
// =============================================================================

/// Quiet period after the last filter change before results are recomputed.
pub const DEBOUNCE_MS: u64 = 300;

/// Whether filter state is mirrored into the URL query string.
pub const URL_SYNC: bool = true;

// =============================================================================
// PERSISTED STORAGE
// =============================================================================

/// Storage key holding the bookmarked tool ids (JSON array of strings).
pub const BOOKMARKS_KEY: &str = "toolshelf-bookmarks";

/// Storage key holding recent search terms (JSON array of strings).
pub const RECENT_SEARCHES_KEY: &str = "toolshelf-recent-searches";

/// Maximum number of recent search terms retained.
pub const RECENT_SEARCH_LIMIT: usize = 5;

/// Default on-disk location of the file storage backend.
pub const STORAGE_PATH: &str = ".toolshelf/storage.json";

/// Capacity of the storage change broadcast channel per profile.
pub const STORAGE_EVENT_CAPACITY: usize = 64;

/// Whether unresolvable bookmark ids are pruned when the bookmark set loads.
pub const PRUNE_BOOKMARKS: bool = false;

// =============================================================================
// CATALOG LISTINGS
// =============================================================================

/// Default number of featured tools shown in a listing.
pub const FEATURED_LIMIT: usize = 6;

/// Default number of newest tools shown in a listing.
pub const NEWEST_LIMIT: usize = 6;

/// Default number of similar tools suggested for a tool.
pub const SIMILAR_LIMIT: usize = 4;

// =============================================================================
// SIMILARITY SCORING
// =============================================================================

/// Score added when a candidate shares the target's category.
pub const SIMILAR_CATEGORY_SCORE: u32 = 3;

/// Score added per tag shared with the target.
pub const SIMILAR_TAG_SCORE: u32 = 2;

/// Score added when the target lists the candidate as an alternative.
pub const SIMILAR_ALTERNATIVE_SCORE: u32 = 5;

// =============================================================================
// ANALYTICS
// =============================================================================

/// Whether analytics events are dispatched at all.
pub const ANALYTICS_ENABLED: bool = true;

/// Default buffer capacity of the analytics event bus.
pub const EVENT_BUS_CAPACITY: usize = 256;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_keys_are_distinct() {
        assert_ne!(BOOKMARKS_KEY, RECENT_SEARCHES_KEY);
    }

    #[test]
    fn test_similarity_weights_order() {
        assert!(SIMILAR_ALTERNATIVE_SCORE > SIMILAR_CATEGORY_SCORE);
        assert!(SIMILAR_CATEGORY_SCORE > SIMILAR_TAG_SCORE);
    }
}
