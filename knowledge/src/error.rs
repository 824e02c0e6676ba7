//! Error types for the knowledge catalog.

use thiserror::Error;

/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Errors raised while loading a knowledge catalog.
///
/// `InvalidPattern` is recoverable: the catalog logs it, skips the pattern and
/// keeps it as a diagnostic. Every other variant aborts the load.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// A question pattern failed to compile.
    #[error("invalid pattern {pattern:?} in entry {entry_id}: {message}")]
    InvalidPattern {
        entry_id: String,
        pattern: String,
        message: String,
    },

    /// Entry has no answer text.
    #[error("entry {0} has an empty answer")]
    EmptyAnswer(String),

    /// Entry has neither patterns nor keywords, so nothing can reach it.
    #[error("entry {0} has neither question patterns nor keywords")]
    Unreachable(String),

    /// Two entries share an id.
    #[error("duplicate entry id: {0}")]
    DuplicateId(String),

    /// Priorities start at 1.
    #[error("entry {0} has priority 0")]
    InvalidPriority(String),

    /// Catalog file extension is not `.toml` or `.json`.
    #[error("unsupported catalog format: {0}")]
    UnsupportedFormat(String),

    /// TOML parse error.
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
