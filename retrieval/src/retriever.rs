//! Vector retrieval with title enrichment and quality evaluation.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::RetrievalConfig;
use crate::error::Result;
use crate::store::{DocumentMetadataStore, VectorIndex};
use crate::types::{ChunkHit, RetrievalResult, VectorChunk};

/// Queries the vector index and joins in document titles.
///
/// Retrieval runs in two stages: a similarity search for raw hits, then one
/// batched title lookup for the distinct documents among them. Titles live in
/// a separate store, and batching avoids a lookup per chunk.
pub struct VectorRetriever {
    index: Arc<dyn VectorIndex>,
    metadata: Arc<dyn DocumentMetadataStore>,
    config: RetrievalConfig,
}

impl VectorRetriever {
    /// Create a retriever over the given stores.
    pub fn new(
        index: Arc<dyn VectorIndex>,
        metadata: Arc<dyn DocumentMetadataStore>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            index,
            metadata,
            config,
        }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Chunks for `identity` closest to `embedding`.
    ///
    /// Every returned chunk scores at least `min_similarity`; at most `top_k`
    /// are returned, closest first.
    pub async fn query(
        &self,
        identity: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<VectorChunk>> {
        let min_similarity = self.config.min_similarity;
        let hits = self
            .index
            .search(identity, embedding, min_similarity, top_k)
            .await?;
        let received = hits.len();

        // The index is asked for the threshold, but is not trusted to apply it.
        let mut hits: Vec<ChunkHit> = hits
            .into_iter()
            .filter(|h| h.score >= min_similarity)
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(top_k);

        debug!(
            "Kept {} of {received} hits for {identity} (min similarity {min_similarity})",
            hits.len()
        );

        if hits.is_empty() {
            return Ok(Vec::new());
        }

        let titles = self.lookup_titles(&hits).await;
        Ok(hits
            .into_iter()
            .map(|hit| {
                let title = titles.get(&hit.document_id).cloned().unwrap_or_default();
                VectorChunk::from_hit(hit, title)
            })
            .collect())
    }

    /// Query and evaluate the configured quality policy.
    pub async fn retrieve(
        &self,
        identity: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<RetrievalResult> {
        let chunks = self.query(identity, embedding, top_k).await?;
        let quality_heuristic_met = self.config.quality.is_met(&chunks);
        Ok(RetrievalResult {
            chunks,
            quality_heuristic_met,
        })
    }

    async fn lookup_titles(&self, hits: &[ChunkHit]) -> HashMap<String, String> {
        let mut seen = HashSet::new();
        let ids: Vec<String> = hits
            .iter()
            .filter(|h| seen.insert(h.document_id.as_str()))
            .map(|h| h.document_id.clone())
            .collect();

        match self.metadata.titles(&ids).await {
            Ok(titles) => titles.into_iter().map(|t| (t.id, t.title)).collect(),
            Err(err) => {
                warn!(
                    "Title lookup failed for {} documents, continuing without titles: {err}",
                    ids.len()
                );
                HashMap::new()
            }
        }
    }
}
