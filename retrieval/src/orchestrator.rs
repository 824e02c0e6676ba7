//! Retrieval orchestration: identity resolution, embedding, vector query.

use std::sync::Arc;

use tokio::time::timeout;
use tracing::{debug, info, warn};

use chatdesk_embeddings::{EmbeddingError, EmbeddingProvider};

use crate::error::{Result, RetrievalError};
use crate::retriever::VectorRetriever;
use crate::store::IdentityResolver;
use crate::types::RetrievalResult;

/// Turns a tenant's question into qualified context chunks.
///
/// The embedding call gates the vector query: if embedding fails or times out
/// the whole retrieval fails. A failed identity lookup only falls back to the
/// caller's identity.
pub struct RetrievalOrchestrator {
    embedder: Arc<dyn EmbeddingProvider>,
    resolver: Arc<dyn IdentityResolver>,
    retriever: VectorRetriever,
}

impl RetrievalOrchestrator {
    /// Create an orchestrator.
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        resolver: Arc<dyn IdentityResolver>,
        retriever: VectorRetriever,
    ) -> Self {
        Self {
            embedder,
            resolver,
            retriever,
        }
    }

    /// Retrieve with the configured `top_k`.
    pub async fn retrieve_default(
        &self,
        tenant: &str,
        query_text: &str,
    ) -> Result<RetrievalResult> {
        self.retrieve(tenant, query_text, self.retriever.config().top_k)
            .await
    }

    /// Retrieve up to `top_k` chunks relevant to `query_text` for `tenant`.
    pub async fn retrieve(
        &self,
        tenant: &str,
        query_text: &str,
        top_k: usize,
    ) -> Result<RetrievalResult> {
        let config = self.retriever.config();
        let identity = self.resolve_identity(tenant).await;

        let embed_budget = config.embed_timeout();
        let embedding = match timeout(embed_budget, self.embedder.embed_text(query_text)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(EmbeddingError::Timeout {
                    timeout_ms: embed_budget.as_millis() as u64,
                }
                .into());
            }
        };
        debug!("Embedded query for {tenant} ({} dims)", embedding.len());

        let query_budget = config.query_timeout();
        let result = timeout(query_budget, self.retriever.retrieve(&identity, &embedding, top_k))
            .await
            .map_err(|_| RetrievalError::Timeout {
                stage: "vector query",
                timeout_ms: query_budget.as_millis() as u64,
            })??;

        info!(
            "Retrieved {} chunks for {tenant} via {identity} (quality met: {})",
            result.chunks.len(),
            result.quality_heuristic_met
        );
        Ok(result)
    }

    /// The identity documents are partitioned under, falling back to `tenant`.
    pub async fn resolve_identity(&self, tenant: &str) -> String {
        let budget = self.retriever.config().query_timeout();
        match timeout(budget, self.resolver.owner_for(tenant)).await {
            Ok(Ok(Some(owner))) => {
                debug!("Resolved workspace {tenant} to owner {owner}");
                owner
            }
            Ok(Ok(None)) => {
                debug!("No owner mapping for {tenant}, using it directly");
                tenant.to_string()
            }
            Ok(Err(err)) => {
                warn!("Identity lookup failed for {tenant}, using it directly: {err}");
                tenant.to_string()
            }
            Err(_) => {
                warn!("Identity lookup timed out for {tenant}, using it directly");
                tenant.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetrievalConfig;
    use crate::memory::{InMemoryStore, StoredChunk};
    use crate::store::VectorIndex;
    use crate::types::ChunkHit;
    use async_trait::async_trait;
    use chatdesk_embeddings::StaticProvider;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    struct BrokenResolver;

    #[async_trait]
    impl IdentityResolver for BrokenResolver {
        async fn owner_for(&self, _: &str) -> Result<Option<String>> {
            Err(RetrievalError::IdentityResolution("connection refused".to_string()))
        }
    }

    struct SlowResolver;

    #[async_trait]
    impl IdentityResolver for SlowResolver {
        async fn owner_for(&self, _: &str) -> Result<Option<String>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Some("owner-1".to_string()))
        }
    }

    struct SlowIndex;

    #[async_trait]
    impl VectorIndex for SlowIndex {
        async fn search(&self, _: &str, _: &[f32], _: f32, _: usize) -> Result<Vec<ChunkHit>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Vec::new())
        }
    }

    struct SlowProvider;

    #[async_trait]
    impl EmbeddingProvider for SlowProvider {
        fn name(&self) -> &str {
            "slow"
        }
        fn default_model(&self) -> &str {
            "slow"
        }
        fn default_dimension(&self) -> usize {
            2
        }
        async fn embed(
            &self,
            _: chatdesk_embeddings::EmbeddingRequest,
        ) -> chatdesk_embeddings::Result<chatdesk_embeddings::EmbeddingResponse> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Err(EmbeddingError::InvalidResponse("unreachable".to_string()))
        }
        fn is_available(&self) -> bool {
            true
        }
    }

    fn store() -> InMemoryStore {
        InMemoryStore::new()
            .with_document("doc-1", "Shipping FAQ")
            .with_chunk(StoredChunk {
                chunk_id: "c1".to_string(),
                document_id: "doc-1".to_string(),
                tenant_key: "owner-1".to_string(),
                content: "Orders ship within 2 business days.".to_string(),
                url: Some("https://shop.example/faq#shipping".to_string()),
                embedding: vec![1.0, 0.0],
            })
            .with_chunk(StoredChunk {
                chunk_id: "c2".to_string(),
                document_id: "doc-1".to_string(),
                tenant_key: "ws-1".to_string(),
                content: "Stored under the workspace id.".to_string(),
                url: None,
                embedding: vec![1.0, 0.0],
            })
            .with_owner("ws-1", "owner-1")
    }

    fn orchestrator(
        embedder: Arc<dyn EmbeddingProvider>,
        resolver: Arc<dyn IdentityResolver>,
    ) -> RetrievalOrchestrator {
        let store = Arc::new(store());
        let retriever = VectorRetriever::new(store.clone(), store, RetrievalConfig::default());
        RetrievalOrchestrator::new(embedder, resolver, retriever)
    }

    fn embedder() -> Arc<dyn EmbeddingProvider> {
        Arc::new(StaticProvider::new(2).with_vector("when will my order ship", vec![0.9, 0.1]))
    }

    #[tokio::test]
    async fn test_resolves_owner_identity() {
        let orchestrator = orchestrator(embedder(), Arc::new(store()));

        let result = orchestrator
            .retrieve_default("ws-1", "when will my order ship")
            .await
            .unwrap();

        assert_eq!(result.chunks.len(), 1);
        assert_eq!(result.chunks[0].chunk_id, "c1");
        assert_eq!(result.chunks[0].title, "Shipping FAQ");
        assert!(result.quality_heuristic_met);
    }

    #[tokio::test]
    async fn test_missing_mapping_uses_original_identity() {
        let orchestrator = orchestrator(embedder(), Arc::new(InMemoryStore::new()));

        let result = orchestrator
            .retrieve("ws-1", "when will my order ship", 6)
            .await
            .unwrap();

        assert_eq!(result.chunks.len(), 1);
        assert_eq!(result.chunks[0].chunk_id, "c2");
    }

    #[tokio::test]
    async fn test_resolver_error_falls_back() {
        let orchestrator = orchestrator(embedder(), Arc::new(BrokenResolver));
        assert_eq!(orchestrator.resolve_identity("ws-1").await, "ws-1");

        let result = orchestrator
            .retrieve("unknown-ws", "when will my order ship", 6)
            .await
            .unwrap();
        assert!(result.chunks.is_empty());
        assert!(!result.quality_heuristic_met);
    }

    #[tokio::test]
    async fn test_embedding_failure_propagates() {
        let orchestrator =
            orchestrator(Arc::new(StaticProvider::unavailable()), Arc::new(store()));

        let err = orchestrator
            .retrieve("ws-1", "when will my order ship", 6)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RetrievalError::Embedding(EmbeddingError::ProviderNotConfigured)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_embedding_timeout_propagates() {
        let orchestrator = orchestrator(Arc::new(SlowProvider), Arc::new(store()));

        let err = orchestrator
            .retrieve("ws-1", "when will my order ship", 6)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RetrievalError::Embedding(EmbeddingError::Timeout { timeout_ms: 8_000 })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_vector_query_timeout_propagates() {
        let store = Arc::new(store());
        let retriever = VectorRetriever::new(
            Arc::new(SlowIndex),
            store.clone(),
            RetrievalConfig::default(),
        );
        let orchestrator = RetrievalOrchestrator::new(embedder(), store, retriever);

        let err = orchestrator
            .retrieve("ws-1", "when will my order ship", 6)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RetrievalError::Timeout {
                stage: "vector query",
                timeout_ms: 5_000
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_identity_timeout_falls_back() {
        let orchestrator = orchestrator(embedder(), Arc::new(SlowResolver));
        assert_eq!(orchestrator.resolve_identity("ws-1").await, "ws-1");

        // Retrieval still runs, under the workspace id.
        let result = orchestrator
            .retrieve("ws-1", "when will my order ship", 6)
            .await
            .unwrap();
        assert_eq!(result.chunks.len(), 1);
        assert_eq!(result.chunks[0].chunk_id, "c2");
    }
}
