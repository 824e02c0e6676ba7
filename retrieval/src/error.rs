//! Error types for retrieval.

use thiserror::Error;

/// Result type alias for retrieval operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Errors that can occur while retrieving context.
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// Query embedding failed; retrieval aborts rather than rank against a
    /// placeholder vector.
    #[error("embedding error: {0}")]
    Embedding(#[from] chatdesk_embeddings::EmbeddingError),

    /// Vector index unreachable or the similarity RPC failed.
    #[error("vector index error: {0}")]
    Index(String),

    /// Document metadata lookup failed.
    #[error("document metadata error: {0}")]
    Metadata(String),

    /// Workspace-to-owner lookup failed. Never fatal to `retrieve`.
    #[error("identity resolution error: {0}")]
    IdentityResolution(String),

    /// A network stage exceeded its time budget.
    #[error("{stage} timed out after {timeout_ms}ms")]
    Timeout { stage: &'static str, timeout_ms: u64 },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Knowledge catalog error.
    #[error("catalog error: {0}")]
    Catalog(#[from] chatdesk_knowledge::CatalogError),

    /// TOML parse error.
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
