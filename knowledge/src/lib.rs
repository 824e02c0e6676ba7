//! # Knowledge
//!
//! This crate answers support questions from a curated, static catalog of
//! knowledge entries. It is the fast, free, deterministic first stage of the
//! answer pipeline:
//!
//! - **Tokenizer**: lowercase alphanumeric tokens for keyword scoring
//! - **Pattern Matcher**: ordered question patterns, first match wins
//! - **Keyword Scorer**: normalized keyword overlap boosted by entry priority
//! - **Knowledge Selector**: pattern phase, then fuzzy phase, then truncation
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Knowledge Selector                         │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  utterance ──► PatternSet (catalog order) ──► MatchResult       │
//! │       │              │ no hit                  ▲                │
//! │       ▼              ▼                         │                │
//! │  tokenize/uniq ──► KeywordScorer ──► best ─────┘                │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use chatdesk_knowledge::{KnowledgeCatalog, KnowledgeSelector};
//!
//! let catalog = Arc::new(KnowledgeCatalog::builtin()?);
//! let selector = KnowledgeSelector::with_defaults(catalog);
//!
//! if let Some(hit) = selector.select("how much does it cost") {
//!     println!("{} ({})", hit.answer, hit.score);
//! }
//! ```

pub mod catalog;
pub mod entry;
pub mod error;
pub mod pattern;
pub mod scoring;
pub mod selector;
pub mod tokenizer;

pub use catalog::{CatalogEntry, KnowledgeCatalog};
pub use entry::{KnowledgeEntry, MatchReason, MatchResult};
pub use error::{CatalogError, Result};
pub use pattern::PatternSet;
pub use scoring::{KeywordScore, KeywordScorer, KeywordSet};
pub use selector::{KnowledgeSelector, SelectorConfig, truncate_answer};
pub use tokenizer::{tokenize, uniq};
