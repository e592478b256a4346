//! # toolshelf-store
//!
//! Browser-style persisted storage for toolshelf.
//!
//! This crate provides:
//! - String-valued storage backends (in-memory and single JSON file)
//! - A per-profile [`StorageArea`] that broadcasts every change to all open
//!   handles ("tabs"), including the tab that made it
//! - [`PersistedValue`], a typed in-memory mirror of one key
//! - The [`BookmarkSet`] and [`RecentSearches`] built on top of it
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use toolshelf_core::{Analytics, Catalog};
//! use toolshelf_store::{BookmarkSet, StorageArea};
//!
//! let area = StorageArea::in_memory();
//! let catalog = Arc::new(Catalog::bundled().unwrap());
//! let mut bookmarks = BookmarkSet::new(area.open_tab(), catalog, Analytics::disabled());
//!
//! assert!(bookmarks.toggle("vite"));
//! assert!(bookmarks.is_saved("vite"));
//! assert_eq!(bookmarks.tools()[0].name, "Vite");
//! ```

pub mod backend;
pub mod bookmarks;
pub mod recent;
pub mod store;
pub mod value;

// Re-export core types
pub use toolshelf_core::*;

pub use backend::{FileBackend, MemoryBackend};
pub use bookmarks::{BookmarkSet, BookmarkState};
pub use recent::RecentSearches;
pub use store::{PersistedStore, StorageArea, StorageChange, StorageSubscription, TabId};
pub use value::PersistedValue;
