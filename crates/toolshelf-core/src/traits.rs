//! Core traits for toolshelf abstractions.
//!
//! These traits define the seams that concrete implementations must satisfy,
//! enabling pluggable storage backends, URL bars and catalog sources.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Tool;

// =============================================================================
// STORAGE
// =============================================================================

/// String-valued key-value storage with browser local-storage semantics.
///
/// Each operation is atomic per key. Implementations do not notify anyone;
/// change notification is layered on top by the store.
pub trait StorageBackend: Send + Sync {
    /// Fetch the raw value stored under `key`.
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Delete `key`. Deleting an absent key is not an error.
    fn remove_item(&self, key: &str) -> Result<()>;

    /// List every stored key.
    fn keys(&self) -> Result<Vec<String>>;
}

// =============================================================================
// LOCATION
// =============================================================================

/// The query-string part of the current location.
///
/// `replace_query` must update the current history entry in place: no
/// navigation, no reload, no new entry.
pub trait LocationHistory: Send + Sync {
    /// Current query string, without the leading `?`.
    fn query(&self) -> String;

    /// Replace the current query string.
    fn replace_query(&self, query: &str);
}

// =============================================================================
// CATALOG SOURCE
// =============================================================================

/// Resolves tool ids into catalog records.
///
/// The bundled catalog resolves synchronously, but the interface is async so a
/// remote catalog can be substituted.
#[async_trait]
pub trait ToolResolver: Send + Sync {
    /// Resolve `ids` in order, silently skipping ids with no catalog entry.
    async fn resolve(&self, ids: &[String]) -> Vec<Tool>;
}
