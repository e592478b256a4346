//! # toolshelf-search
//!
//! Filtering, sorting and URL-synchronized search sessions for toolshelf.
//!
//! This crate provides:
//! - A pure filter/sort engine over catalog slices
//! - A query-string codec for filter specifications
//! - A cancellable debouncer
//! - [`SearchSession`], which ties specification, results and URL together
//!
//! ## Example
//!
//! ```
//! use toolshelf_core::{Catalog, Category, FilterSpec, SortKey};
//! use toolshelf_search::{filter_tools, url_params};
//!
//! let catalog = Catalog::bundled().unwrap();
//! let spec = FilterSpec::new()
//!     .with_category(Category::Backend)
//!     .sorted_by(SortKey::Stars);
//!
//! let results = filter_tools(catalog.all(), &spec);
//! assert!(results.iter().all(|t| t.category == Category::Backend));
//!
//! let query = url_params::to_query(&spec);
//! assert_eq!(query, "categories=backend&sortBy=stars");
//! assert_eq!(url_params::from_query(&query), spec);
//! ```

pub mod debounce;
pub mod filter;
pub mod session;
pub mod url_params;

// Re-export core types
pub use toolshelf_core::*;

pub use debounce::Debouncer;
pub use filter::{filter_tools, sort_tools, SearchEngine};
pub use session::{MemoryHistory, SearchSession};
