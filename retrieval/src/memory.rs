//! In-memory implementations of the store traits.
//!
//! Used by tests and by the CLI, which loads a JSON fixture of documents,
//! chunk vectors and workspace owners.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use chatdesk_embeddings::{Embedding, find_top_k};

use crate::error::{Result, RetrievalError};
use crate::store::{DocumentMetadataStore, IdentityResolver, VectorIndex};
use crate::types::{ChunkHit, DocumentTitle};

/// A chunk with its vector, as stored in the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredChunk {
    pub chunk_id: String,
    pub document_id: String,
    /// Partition key the chunk is stored under.
    pub tenant_key: String,
    pub content: String,
    #[serde(default)]
    pub url: Option<String>,
    pub embedding: Embedding,
}

/// Serialized form of an [`InMemoryStore`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreFixture {
    #[serde(default)]
    pub documents: Vec<DocumentTitle>,

    #[serde(default)]
    pub chunks: Vec<StoredChunk>,

    /// Workspace id to owner id.
    #[serde(default)]
    pub owners: HashMap<String, String>,
}

/// Vector index, title store and identity resolver held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    chunks: HashMap<String, Vec<StoredChunk>>,
    titles: HashMap<String, String>,
    owners: HashMap<String, String>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a fixture.
    pub fn from_fixture(fixture: StoreFixture) -> Self {
        let mut store = Self::new();
        for doc in fixture.documents {
            store = store.with_document(doc.id, doc.title);
        }
        for chunk in fixture.chunks {
            store = store.with_chunk(chunk);
        }
        store.owners = fixture.owners;
        store
    }

    /// Load a JSON fixture file.
    pub async fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await?;
        let fixture: StoreFixture = serde_json::from_str(&content)?;
        info!(
            "Loaded {} chunks and {} documents from {}",
            fixture.chunks.len(),
            fixture.documents.len(),
            path.display()
        );
        Ok(Self::from_fixture(fixture))
    }

    /// Register a document title.
    pub fn with_document(mut self, id: impl Into<String>, title: impl Into<String>) -> Self {
        self.titles.insert(id.into(), title.into());
        self
    }

    /// Add a chunk under its tenant key.
    pub fn with_chunk(mut self, chunk: StoredChunk) -> Self {
        self.chunks
            .entry(chunk.tenant_key.clone())
            .or_default()
            .push(chunk);
        self
    }

    /// Map a workspace to the owner its documents are keyed by.
    pub fn with_owner(
        mut self,
        workspace_id: impl Into<String>,
        owner_id: impl Into<String>,
    ) -> Self {
        self.owners.insert(workspace_id.into(), owner_id.into());
        self
    }

    /// Number of chunks across all tenants.
    pub fn chunk_count(&self) -> usize {
        self.chunks.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl VectorIndex for InMemoryStore {
    async fn search(
        &self,
        tenant_key: &str,
        query_vector: &[f32],
        threshold: f32,
        match_count: usize,
    ) -> Result<Vec<ChunkHit>> {
        let Some(chunks) = self.chunks.get(tenant_key) else {
            debug!("No chunks stored for tenant {tenant_key}");
            return Ok(Vec::new());
        };

        let by_id: HashMap<&str, &StoredChunk> =
            chunks.iter().map(|c| (c.chunk_id.as_str(), c)).collect();
        let candidates = chunks
            .iter()
            .map(|c| (c.chunk_id.as_str(), c.embedding.as_slice()));

        let ranked = find_top_k(query_vector, candidates, match_count, threshold)
            .map_err(|e| RetrievalError::Index(e.to_string()))?;

        Ok(ranked
            .into_iter()
            .filter_map(|r| {
                by_id.get(r.id.as_str()).map(|c| ChunkHit {
                    chunk_id: c.chunk_id.clone(),
                    document_id: c.document_id.clone(),
                    content: c.content.clone(),
                    score: r.score,
                    url: c.url.clone(),
                })
            })
            .collect())
    }
}

#[async_trait]
impl DocumentMetadataStore for InMemoryStore {
    async fn titles(&self, document_ids: &[String]) -> Result<Vec<DocumentTitle>> {
        Ok(document_ids
            .iter()
            .filter_map(|id| {
                self.titles.get(id).map(|title| DocumentTitle {
                    id: id.clone(),
                    title: title.clone(),
                })
            })
            .collect())
    }
}

#[async_trait]
impl IdentityResolver for InMemoryStore {
    async fn owner_for(&self, workspace_id: &str) -> Result<Option<String>> {
        Ok(self.owners.get(workspace_id).cloned())
    }
}
