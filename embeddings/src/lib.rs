//! # Embeddings
//!
//! This crate turns support utterances into dense vectors and compares them.
//!
//! ## Features
//!
//! - **Embedding Generation**: OpenAI-compatible HTTP provider with bounded timeouts
//! - **Typed Failures**: a failed call is an `EmbeddingError`, never a placeholder vector
//! - **Similarity**: cosine similarity and top-k ranking for in-memory indexes
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Embeddings                                   │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  EmbeddingRequest ──► EmbeddingProvider ──► EmbeddingResponse   │
//! │                            │                                    │
//! │                            ▼                                    │
//! │                OpenAIProvider / StaticProvider                  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod provider;
pub mod similarity;

pub use error::{EmbeddingError, Result};
pub use provider::{
    EmbeddingProvider, EmbeddingRequest, EmbeddingResponse, OpenAIProvider, StaticProvider,
};
pub use similarity::{SimilarityResult, cosine_similarity, find_top_k};

/// A dense vector embedding.
pub type Embedding = Vec<f32>;

/// Dimension of embeddings (varies by model).
pub const DEFAULT_DIMENSION: usize = 1536; // OpenAI text-embedding-3-small
