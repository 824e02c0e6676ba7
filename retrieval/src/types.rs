//! Records exchanged with the vector index and returned to callers.

use serde::{Deserialize, Serialize};

/// A raw similarity hit, before title enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkHit {
    pub chunk_id: String,
    pub document_id: String,
    pub content: String,
    /// Similarity, higher is closer.
    pub score: f32,
    #[serde(default)]
    pub url: Option<String>,
}

/// A document's human-readable title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentTitle {
    pub id: String,
    pub title: String,
}

/// One retrieved document fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorChunk {
    pub chunk_id: String,
    pub document_id: String,
    /// Empty when the metadata store had no title for the document.
    pub title: String,
    pub content: String,
    pub score: f32,
    pub url: Option<String>,
}

impl VectorChunk {
    /// Join a hit with its document title.
    pub fn from_hit(hit: ChunkHit, title: impl Into<String>) -> Self {
        Self {
            chunk_id: hit.chunk_id,
            document_id: hit.document_id,
            title: title.into(),
            content: hit.content,
            score: hit.score,
            url: hit.url,
        }
    }
}

/// Threshold-filtered chunks and whether they are good enough to answer from.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub chunks: Vec<VectorChunk>,
    pub quality_heuristic_met: bool,
}

impl RetrievalResult {
    /// Whether no chunk survived filtering.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// The closest chunk, if any.
    pub fn top(&self) -> Option<&VectorChunk> {
        self.chunks.first()
    }
}
