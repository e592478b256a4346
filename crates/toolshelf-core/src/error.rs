//! Error types for toolshelf.

use thiserror::Error;

/// Result type alias using toolshelf's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for toolshelf operations.
///
/// Expected conditions (unknown ids, empty results, corrupt stored values)
/// are not represented here; those are handled where they occur and logged.
#[derive(Error, Debug)]
pub enum Error {
    /// Storage backend operation failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Two catalog entries share the same id
    #[error("Duplicate tool id in catalog: {0}")]
    DuplicateToolId(String),

    /// Analytics sink rejected an event
    #[error("Analytics error: {0}")]
    Analytics(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
