//! # toolshelf-core
//!
//! Core types, traits, and abstractions for the toolshelf catalog browser.
//!
//! This crate provides the tool data model, the read-only catalog store with
//! its query functions, the analytics event schema and sinks, and the
//! session configuration that the storage and search crates depend on.

pub mod analytics;
pub mod catalog;
pub mod config;
pub mod defaults;
pub mod error;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use analytics::{
    Analytics, AnalyticsEvent, AnalyticsSink, EventBus, EventEnvelope, NullSink, TracingSink,
};
pub use catalog::{Catalog, CategoryFilter};
pub use config::ShelfConfig;
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
