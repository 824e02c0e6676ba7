//! # Retrieval
//!
//! This crate resolves support utterances for a tenant. It combines:
//!
//! - **Knowledge**: curated catalog answers, tried first and free
//! - **Embeddings**: the query vector for similarity search
//! - **Vector Retrieval**: tenant-partitioned chunks with document titles
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       Answer Pipeline                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  utterance ──► KnowledgeSelector ── hit ──► Resolution::Knowledge│
//! │                      │ miss                                     │
//! │                      ▼                                          │
//! │                 RateLimiter ── limited ──► Resolution::NoAnswer │
//! │                      │                                          │
//! │                      ▼                                          │
//! │  ┌──────────────────────────────────────────────┐               │
//! │  │            RetrievalOrchestrator             │               │
//! │  │  IdentityResolver ─► EmbeddingProvider ─►    │               │
//! │  │  VectorIndex ─► DocumentMetadataStore        │               │
//! │  └──────────────────────────────────────────────┘               │
//! │                      │                                          │
//! │                      ▼                                          │
//! │        QualityPolicy ──► Resolution::Context / NoAnswer         │
//! │                                                                 │
//! │  every decision ──► EventSink                                   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use chatdesk_retrieval::{AnswerPipeline, InMemoryStore, Resolution};
//!
//! let store = Arc::new(InMemoryStore::load_json("store.json").await?);
//! let pipeline = AnswerPipeline::builder().with_store(store).build()?;
//!
//! match pipeline.resolve("ws-1", "when will my order ship?").await {
//!     Resolution::Knowledge(hit) => println!("{}", hit.answer),
//!     Resolution::Context(ctx) => println!("{} chunks", ctx.chunks.len()),
//!     Resolution::NoAnswer { reason } => println!("{}", reason.user_message()),
//! }
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod memory;
pub mod orchestrator;
pub mod pipeline;
pub mod rate_limit;
pub mod rest;
pub mod retriever;
pub mod store;
pub mod types;

pub use config::{
    DEFAULT_TOP_K, EmbeddingConfig, EmbeddingProviderType, MIN_SIMILARITY, PipelineConfig,
    QualityPolicy, RateLimitConfig, RetrievalConfig,
};
pub use error::{Result, RetrievalError};
pub use events::{EventKind, EventSink, MemorySink, PipelineEvent, Primitive, TracingSink};
pub use memory::{InMemoryStore, StoreFixture, StoredChunk};
pub use orchestrator::RetrievalOrchestrator;
pub use pipeline::{AnswerPipeline, AnswerPipelineBuilder, NoAnswerReason, Resolution};
pub use rate_limit::{Decision, KeyedLimiter, RateLimiter, Unlimited};
pub use rest::{RestStore, RestStoreConfig};
pub use retriever::VectorRetriever;
pub use store::{DocumentMetadataStore, IdentityResolver, VectorIndex};
pub use types::{ChunkHit, DocumentTitle, RetrievalResult, VectorChunk};

// Re-export from dependencies for convenience
pub use chatdesk_embeddings::{EmbeddingError, EmbeddingProvider, OpenAIProvider, StaticProvider};
pub use chatdesk_knowledge::{KnowledgeCatalog, KnowledgeSelector, MatchResult};
