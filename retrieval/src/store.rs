//! Boundary traits for the stores retrieval reads from.
//!
//! Each trait is a narrow, read-only view of an external service. The
//! in-memory implementations live in [`crate::memory`] and the HTTP ones in
//! [`crate::rest`].

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ChunkHit, DocumentTitle};

/// Similarity search over chunk vectors, partitioned by tenant key.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Return up to `match_count` hits for `tenant_key` scoring at least
    /// `threshold`, ranked closest first.
    async fn search(
        &self,
        tenant_key: &str,
        query_vector: &[f32],
        threshold: f32,
        match_count: usize,
    ) -> Result<Vec<ChunkHit>>;
}

/// Batch lookup of document titles.
#[async_trait]
pub trait DocumentMetadataStore: Send + Sync {
    /// Titles for the given ids. Unknown ids are simply absent.
    async fn titles(&self, document_ids: &[String]) -> Result<Vec<DocumentTitle>>;
}

/// Maps a workspace id to the identity its documents are stored under.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// The owner id for `workspace_id`, or `None` if no mapping exists.
    async fn owner_for(&self, workspace_id: &str) -> Result<Option<String>>;
}
