//! The knowledge-first answer pipeline.
//!
//! An utterance is answered from the curated catalog when a confident match
//! exists. Otherwise, subject to the tenant's rate limit, context chunks are
//! retrieved for a generative answer. Every failure ends in
//! [`Resolution::NoAnswer`]; error details go to the log, never to the caller.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use chatdesk_embeddings::EmbeddingProvider;
use chatdesk_knowledge::{KnowledgeCatalog, KnowledgeSelector, MatchResult};

use crate::config::PipelineConfig;
use crate::error::{Result, RetrievalError};
use crate::events::{EventKind, EventSink, PipelineEvent, TracingSink};
use crate::orchestrator::RetrievalOrchestrator;
use crate::rate_limit::{Decision, KeyedLimiter, RateLimiter, Unlimited};
use crate::retriever::VectorRetriever;
use crate::store::{DocumentMetadataStore, IdentityResolver, VectorIndex};
use crate::types::RetrievalResult;

/// Why no answer could be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoAnswerReason {
    /// Neither the catalog nor retrieved context was good enough.
    NoConfidentMatch,
    /// Retrieval failed or timed out.
    ContextUnavailable,
    /// The tenant is over its retrieval rate limit.
    RateLimited,
}

impl NoAnswerReason {
    /// Text safe to show an end user.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NoConfidentMatch => {
                "I'm not sure about that one. Could you rephrase, or ask to talk to a person?"
            }
            Self::ContextUnavailable => {
                "I can't look that up right now. Please try again in a moment."
            }
            Self::RateLimited => {
                "You're sending questions faster than I can answer. Please wait a moment."
            }
        }
    }
}

/// Outcome of resolving one utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Resolution {
    /// Answered from the knowledge catalog.
    Knowledge(MatchResult),
    /// Context chunks good enough to ground a generated answer.
    Context(RetrievalResult),
    /// Nothing usable.
    NoAnswer { reason: NoAnswerReason },
}

impl Resolution {
    pub fn is_answered(&self) -> bool {
        !matches!(self, Self::NoAnswer { .. })
    }
}

/// Resolves utterances for tenants. Cheap to share behind an `Arc`.
pub struct AnswerPipeline {
    selector: KnowledgeSelector,
    orchestrator: RetrievalOrchestrator,
    limiter: Arc<dyn RateLimiter>,
    sink: Arc<dyn EventSink>,
}

impl AnswerPipeline {
    pub fn builder() -> AnswerPipelineBuilder {
        AnswerPipelineBuilder::new()
    }

    pub fn selector(&self) -> &KnowledgeSelector {
        &self.selector
    }

    /// Resolve `utterance` for `tenant`.
    pub async fn resolve(&self, tenant: &str, utterance: &str) -> Resolution {
        if let Some(hit) = self.selector.select(utterance) {
            info!(
                "Answered {tenant} from catalog entry {} (score {:.2}, direct: {})",
                hit.id, hit.score, hit.direct_pattern
            );
            self.emit(PipelineEvent::new(
                tenant,
                EventKind::KnowledgeMatched {
                    entry_id: hit.id.clone(),
                    direct_pattern: hit.direct_pattern,
                    score: hit.score,
                    truncated: hit.truncated,
                },
            ));
            return Resolution::Knowledge(hit);
        }

        if utterance.trim().is_empty() {
            debug!("Blank utterance from {tenant}");
            return self.no_answer(tenant, NoAnswerReason::NoConfidentMatch, None);
        }

        if let Decision::Limited { retry_after } = self.limiter.check_and_increment(tenant) {
            warn!("Retrieval rate limit hit for {tenant}");
            self.emit(PipelineEvent::new(
                tenant,
                EventKind::RateLimited {
                    retry_after_ms: retry_after.as_millis() as u64,
                },
            ));
            return self.no_answer(tenant, NoAnswerReason::RateLimited, None);
        }

        match self.orchestrator.retrieve_default(tenant, utterance).await {
            Ok(result) => {
                self.emit(PipelineEvent::new(
                    tenant,
                    EventKind::ContextRetrieved {
                        chunk_count: result.chunks.len(),
                        quality_heuristic_met: result.quality_heuristic_met,
                        top_score: result.top().map(|c| c.score),
                    },
                ));
                if result.quality_heuristic_met {
                    Resolution::Context(result)
                } else {
                    self.no_answer(tenant, NoAnswerReason::NoConfidentMatch, None)
                }
            }
            Err(err) => {
                warn!("Retrieval failed for {tenant}: {err}");
                self.no_answer(tenant, NoAnswerReason::ContextUnavailable, Some(&err))
            }
        }
    }

    fn no_answer(
        &self,
        tenant: &str,
        reason: NoAnswerReason,
        cause: Option<&RetrievalError>,
    ) -> Resolution {
        let mut event = PipelineEvent::new(tenant, EventKind::NoAnswer { reason });
        if let Some(err) = cause {
            event = event.with_attr("stage", failed_stage(err));
        }
        self.emit(event);
        Resolution::NoAnswer { reason }
    }

    fn emit(&self, event: PipelineEvent) {
        self.sink.emit(&event);
    }
}

/// Coarse label for where retrieval failed.
fn failed_stage(err: &RetrievalError) -> &'static str {
    match err {
        RetrievalError::Embedding(_) => "embedding",
        RetrievalError::Index(_) => "vector query",
        RetrievalError::Metadata(_) => "metadata",
        RetrievalError::IdentityResolution(_) => "identity",
        RetrievalError::Timeout { stage, .. } => *stage,
        _ => "internal",
    }
}

/// Builder for [`AnswerPipeline`].
///
/// The vector index, title store and identity resolver are required; see
/// [`AnswerPipelineBuilder::with_store`]. Everything else has a default:
/// the built-in catalog, the configured embedding provider, a rate limiter
/// from configuration and a [`TracingSink`].
#[derive(Default)]
pub struct AnswerPipelineBuilder {
    config: PipelineConfig,
    catalog: Option<Arc<KnowledgeCatalog>>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    index: Option<Arc<dyn VectorIndex>>,
    metadata: Option<Arc<dyn DocumentMetadataStore>>,
    resolver: Option<Arc<dyn IdentityResolver>>,
    limiter: Option<Arc<dyn RateLimiter>>,
    sink: Option<Arc<dyn EventSink>>,
}

impl AnswerPipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_catalog(mut self, catalog: Arc<KnowledgeCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_index(mut self, index: Arc<dyn VectorIndex>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_metadata(mut self, metadata: Arc<dyn DocumentMetadataStore>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn IdentityResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Use one backend for the index, titles and identity mapping.
    pub fn with_store<S>(self, store: Arc<S>) -> Self
    where
        S: VectorIndex + DocumentMetadataStore + IdentityResolver + 'static,
    {
        self.with_index(store.clone())
            .with_metadata(store.clone())
            .with_resolver(store)
    }

    pub fn with_limiter(mut self, limiter: Arc<dyn RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn build(self) -> Result<AnswerPipeline> {
        let index = self
            .index
            .ok_or_else(|| RetrievalError::Config("vector index not configured".to_string()))?;
        let metadata = self
            .metadata
            .ok_or_else(|| {
                RetrievalError::Config("document metadata store not configured".to_string())
            })?;
        let resolver = self
            .resolver
            .ok_or_else(|| RetrievalError::Config("identity resolver not configured".to_string()))?;

        let catalog = match self.catalog {
            Some(catalog) => catalog,
            None => Arc::new(KnowledgeCatalog::builtin()?),
        };
        let embedder = self
            .embedder
            .unwrap_or_else(|| self.config.embedding.build_provider());
        let limiter: Arc<dyn RateLimiter> = match self.limiter {
            Some(limiter) => limiter,
            None if self.config.rate_limit.enabled => {
                Arc::new(KeyedLimiter::from_config(&self.config.rate_limit))
            }
            None => Arc::new(Unlimited),
        };
        let sink: Arc<dyn EventSink> = match self.sink {
            Some(sink) => sink,
            None => Arc::new(TracingSink),
        };

        debug!(
            "Building pipeline: {} catalog entries, embeddings via {}",
            catalog.len(),
            embedder.name()
        );

        let retriever = VectorRetriever::new(index, metadata, self.config.retrieval);
        Ok(AnswerPipeline {
            selector: KnowledgeSelector::new(catalog, self.config.selector),
            orchestrator: RetrievalOrchestrator::new(embedder, resolver, retriever),
            limiter,
            sink,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RateLimitConfig, RetrievalConfig};
    use crate::events::{MemorySink, Primitive};
    use crate::memory::{InMemoryStore, StoredChunk};
    use chatdesk_embeddings::StaticProvider;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    const WINDOW: Duration = Duration::from_secs(60);
    const SHIPPING_QUESTION: &str = "when will my order ship";

    fn store() -> Arc<InMemoryStore> {
        Arc::new(
            InMemoryStore::new()
                .with_document("doc-1", "Shipping FAQ")
                .with_chunk(StoredChunk {
                    chunk_id: "c1".to_string(),
                    document_id: "doc-1".to_string(),
                    tenant_key: "owner-1".to_string(),
                    content: "Orders ship within 2 business days.".to_string(),
                    url: None,
                    embedding: vec![1.0, 0.0],
                })
                .with_owner("ws-1", "owner-1"),
        )
    }

    fn embedder() -> Arc<dyn EmbeddingProvider> {
        Arc::new(StaticProvider::new(2).with_vector(SHIPPING_QUESTION, vec![0.8, 0.6]))
    }

    fn pipeline(
        embedder: Arc<dyn EmbeddingProvider>,
        limiter: Arc<dyn RateLimiter>,
        sink: Arc<MemorySink>,
    ) -> AnswerPipeline {
        AnswerPipeline::builder()
            .with_store(store())
            .with_embedder(embedder)
            .with_limiter(limiter)
            .with_sink(sink)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_catalog_answer_skips_retrieval() {
        let sink = Arc::new(MemorySink::new());
        // A limiter that refuses everything proves retrieval never ran.
        let limiter = Arc::new(KeyedLimiter::new(0, WINDOW));
        let pipeline = pipeline(Arc::new(StaticProvider::unavailable()), limiter, sink.clone());

        let resolution = pipeline.resolve("ws-1", "how much does it cost").await;

        let Resolution::Knowledge(hit) = resolution else {
            panic!("expected a catalog answer, got {resolution:?}");
        };
        assert_eq!(hit.id, "pricing");
        assert!(hit.direct_pattern);

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name(), "knowledge_matched");
    }

    #[tokio::test]
    async fn test_falls_through_to_context() {
        let sink = Arc::new(MemorySink::new());
        let pipeline = pipeline(embedder(), Arc::new(Unlimited), sink.clone());

        let resolution = pipeline.resolve("ws-1", SHIPPING_QUESTION).await;

        let Resolution::Context(result) = resolution else {
            panic!("expected context, got {resolution:?}");
        };
        assert_eq!(result.chunks.len(), 1);
        assert_eq!(result.chunks[0].title, "Shipping FAQ");
        assert_eq!(
            sink.events()[0].kind,
            EventKind::ContextRetrieved {
                chunk_count: 1,
                quality_heuristic_met: true,
                top_score: Some(result.chunks[0].score),
            }
        );
    }

    #[tokio::test]
    async fn test_empty_context_is_no_confident_match() {
        let sink = Arc::new(MemorySink::new());
        let pipeline = pipeline(embedder(), Arc::new(Unlimited), sink.clone());

        let resolution = pipeline.resolve("ws-unknown", SHIPPING_QUESTION).await;
        assert_eq!(
            resolution,
            Resolution::NoAnswer {
                reason: NoAnswerReason::NoConfidentMatch
            }
        );
        let names: Vec<&str> = sink.events().iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["context_retrieved", "no_answer"]);
    }

    #[tokio::test]
    async fn test_embedding_failure_becomes_no_answer() {
        let sink = Arc::new(MemorySink::new());
        let pipeline = pipeline(
            Arc::new(StaticProvider::unavailable()),
            Arc::new(Unlimited),
            sink.clone(),
        );

        let resolution = pipeline.resolve("ws-1", SHIPPING_QUESTION).await;
        assert_eq!(
            resolution,
            Resolution::NoAnswer {
                reason: NoAnswerReason::ContextUnavailable
            }
        );

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].extra.get("stage"), Some(&Primitive::from("embedding")));
    }

    #[tokio::test]
    async fn test_rate_limit_guards_retrieval() {
        let sink = Arc::new(MemorySink::new());
        let limiter = Arc::new(KeyedLimiter::new(1, WINDOW));
        let pipeline = pipeline(embedder(), limiter, sink.clone());

        assert!(pipeline.resolve("ws-1", SHIPPING_QUESTION).await.is_answered());
        assert_eq!(
            pipeline.resolve("ws-1", SHIPPING_QUESTION).await,
            Resolution::NoAnswer {
                reason: NoAnswerReason::RateLimited
            }
        );
        // Catalog answers are free and stay available.
        assert!(pipeline.resolve("ws-1", "do you have a free trial").await.is_answered());

        let names: Vec<&str> = sink.events().iter().map(|e| e.name()).collect();
        assert_eq!(
            names,
            vec!["context_retrieved", "rate_limited", "no_answer", "knowledge_matched"]
        );
    }

    #[tokio::test]
    async fn test_blank_utterance() {
        let sink = Arc::new(MemorySink::new());
        let limiter = Arc::new(KeyedLimiter::new(0, WINDOW));
        let pipeline = pipeline(embedder(), limiter, sink);

        assert_eq!(
            pipeline.resolve("ws-1", "   ").await,
            Resolution::NoAnswer {
                reason: NoAnswerReason::NoConfidentMatch
            }
        );
    }

    #[test]
    fn test_builder_requires_store() {
        let err = AnswerPipeline::builder().build().err().unwrap();
        assert!(matches!(err, RetrievalError::Config(_)));
    }

    #[tokio::test]
    async fn test_builder_uses_config() {
        let config = PipelineConfig::default()
            .with_retrieval(RetrievalConfig::default().with_min_similarity(0.95))
            .with_rate_limit(RateLimitConfig {
                enabled: false,
                ..RateLimitConfig::default()
            });
        let sink = Arc::new(MemorySink::new());
        let pipeline = AnswerPipeline::builder()
            .with_config(config)
            .with_store(store())
            .with_embedder(embedder())
            .with_sink(sink)
            .build()
            .unwrap();

        // cos([0.8, 0.6], [1, 0]) = 0.8, below the configured floor.
        assert_eq!(
            pipeline.resolve("ws-1", SHIPPING_QUESTION).await,
            Resolution::NoAnswer {
                reason: NoAnswerReason::NoConfidentMatch
            }
        );
    }

    #[test]
    fn test_resolution_serializes_tagged() {
        let json = serde_json::to_value(Resolution::NoAnswer {
            reason: NoAnswerReason::RateLimited,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"type": "no_answer", "reason": "rate_limited"}));
    }
}
