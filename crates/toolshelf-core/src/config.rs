//! Session configuration.
//!
//! A [`ShelfConfig`] is constructed once when a session starts and handed to
//! the components that need it. Nothing reads the environment after that.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::defaults;

/// Configuration shared by the store, search and analytics components.
///
/// # Example
/// ```
/// use toolshelf_core::ShelfConfig;
///
/// let config = ShelfConfig::default();
/// assert_eq!(config.debounce_ms, 300);
/// assert!(config.url_sync);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShelfConfig {
    /// Quiet period before filtered results are recomputed.
    pub debounce_ms: u64,

    /// Mirror filter state into the URL query string.
    pub url_sync: bool,

    /// Maximum number of recent search terms retained.
    pub recent_search_limit: usize,

    /// Dispatch analytics events.
    pub analytics_enabled: bool,

    /// Drop bookmark ids with no catalog entry when the bookmark set loads.
    pub prune_bookmarks: bool,

    /// File backing persisted storage.
    pub storage_path: PathBuf,

    /// Catalog JSON to load instead of the bundled catalog.
    pub catalog_path: Option<PathBuf>,
}

impl Default for ShelfConfig {
    fn default() -> Self {
        Self {
            debounce_ms: defaults::DEBOUNCE_MS,
            url_sync: defaults::URL_SYNC,
            recent_search_limit: defaults::RECENT_SEARCH_LIMIT,
            analytics_enabled: defaults::ANALYTICS_ENABLED,
            prune_bookmarks: defaults::PRUNE_BOOKMARKS,
            storage_path: PathBuf::from(defaults::STORAGE_PATH),
            catalog_path: None,
        }
    }
}

impl ShelfConfig {
    /// Constructs configuration from environment variables.
    ///
    /// Environment variables:
    /// - `SHELF_DEBOUNCE_MS` (default: 300)
    /// - `SHELF_URL_SYNC` (default: true)
    /// - `SHELF_RECENT_SEARCH_LIMIT` (default: 5)
    /// - `SHELF_ANALYTICS_ENABLED` (default: true)
    /// - `SHELF_PRUNE_BOOKMARKS` (default: false)
    /// - `SHELF_STORAGE_PATH` (default: `.toolshelf/storage.json`)
    /// - `SHELF_CATALOG_PATH` (optional)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Constructs configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let base = Self::default();
        Self {
            debounce_ms: parse_number(&lookup, "SHELF_DEBOUNCE_MS", base.debounce_ms),
            url_sync: parse_bool(&lookup, "SHELF_URL_SYNC", base.url_sync),
            recent_search_limit: parse_number(
                &lookup,
                "SHELF_RECENT_SEARCH_LIMIT",
                base.recent_search_limit,
            ),
            analytics_enabled: parse_bool(&lookup, "SHELF_ANALYTICS_ENABLED", base.analytics_enabled),
            prune_bookmarks: parse_bool(&lookup, "SHELF_PRUNE_BOOKMARKS", base.prune_bookmarks),
            storage_path: lookup("SHELF_STORAGE_PATH")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(base.storage_path),
            catalog_path: lookup("SHELF_CATALOG_PATH")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        }
    }

    /// Debounce window as a [`Duration`].
    #[inline]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Recognizes "true", "1", "yes", "on" and "false", "0", "no", "off"
/// (case-insensitive). Anything else falls back to `default` with a warning.
fn parse_bool<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => true,
        "false" | "0" | "no" | "off" => false,
        _ => {
            warn!(key, value = %raw, default, "Unrecognized boolean, using default");
            default
        }
    }
}

fn parse_number<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    raw.trim().parse().unwrap_or_else(|_| {
        warn!(key, value = %raw, %default, "Unparseable number, using default");
        default
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    // Environment variables are process-global, so tests touching them must not
    // run in parallel.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ShelfConfig::default();
        assert_eq!(config.debounce_ms, 300);
        assert!(config.url_sync);
        assert_eq!(config.recent_search_limit, 5);
        assert!(config.analytics_enabled);
        assert!(!config.prune_bookmarks);
        assert_eq!(config.storage_path, PathBuf::from(".toolshelf/storage.json"));
        assert!(config.catalog_path.is_none());
    }

    #[test]
    fn test_empty_lookup_equals_default() {
        let config = ShelfConfig::from_lookup(|_| None);
        assert_eq!(config, ShelfConfig::default());
    }

    #[test]
    fn test_lookup_overrides() {
        let config = ShelfConfig::from_lookup(lookup_from(&[
            ("SHELF_DEBOUNCE_MS", "150"),
            ("SHELF_URL_SYNC", "off"),
            ("SHELF_RECENT_SEARCH_LIMIT", "10"),
            ("SHELF_ANALYTICS_ENABLED", "0"),
            ("SHELF_PRUNE_BOOKMARKS", "YES"),
            ("SHELF_STORAGE_PATH", "/tmp/shelf.json"),
            ("SHELF_CATALOG_PATH", "tools.json"),
        ]));
        assert_eq!(config.debounce(), Duration::from_millis(150));
        assert!(!config.url_sync);
        assert_eq!(config.recent_search_limit, 10);
        assert!(!config.analytics_enabled);
        assert!(config.prune_bookmarks);
        assert_eq!(config.storage_path, PathBuf::from("/tmp/shelf.json"));
        assert_eq!(config.catalog_path, Some(PathBuf::from("tools.json")));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = ShelfConfig::from_lookup(lookup_from(&[
            ("SHELF_DEBOUNCE_MS", "soon"),
            ("SHELF_URL_SYNC", "maybe"),
            ("SHELF_RECENT_SEARCH_LIMIT", "-3"),
            ("SHELF_STORAGE_PATH", "  "),
        ]));
        assert_eq!(config, ShelfConfig::default());
    }

    #[test]
    fn test_from_env_reads_process_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("SHELF_DEBOUNCE_MS", "42");
        let config = ShelfConfig::from_env();
        env::remove_var("SHELF_DEBOUNCE_MS");
        assert_eq!(config.debounce_ms, 42);
    }
}
