//! PostgREST-style HTTP implementations of the store traits.
//!
//! The similarity search is a stored procedure called over `/rpc`, titles and
//! workspace owners are plain table reads.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, RetrievalError};
use crate::store::{DocumentMetadataStore, IdentityResolver, VectorIndex};
use crate::types::{ChunkHit, DocumentTitle};

/// Connection settings for the REST backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestStoreConfig {
    /// Project URL, without the `/rest/v1` suffix.
    pub base_url: String,

    /// Service key sent as `apikey` and bearer token.
    pub api_key: String,

    /// Name of the similarity search procedure.
    pub match_function: String,

    /// Table holding document titles.
    pub documents_table: String,

    /// Table mapping workspaces to owners.
    pub workspaces_table: String,

    /// Per-request timeout (milliseconds).
    pub timeout_ms: u64,
}

impl Default for RestStoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:54321".to_string(),
            api_key: String::new(),
            match_function: "match_document_chunks".to_string(),
            documents_table: "documents".to_string(),
            workspaces_table: "workspaces".to_string(),
            timeout_ms: 5_000,
        }
    }
}

/// HTTP client for the vector index, document metadata and workspace tables.
pub struct RestStore {
    config: RestStoreConfig,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct MatchRequest<'a> {
    tenant_key: &'a str,
    query_embedding: &'a [f32],
    match_threshold: f32,
    match_count: usize,
}

#[derive(Debug, Deserialize)]
struct MatchRow {
    #[serde(alias = "id")]
    chunk_id: String,
    document_id: String,
    content: String,
    #[serde(alias = "similarity")]
    score: f32,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WorkspaceRow {
    owner_id: Option<String>,
}

impl RestStore {
    /// Create a client for the given backend.
    pub fn new(config: RestStoreConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/rest/v1/{path}", self.config.base_url.trim_end_matches('/'))
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.url(path))
            .header("apikey", &self.config.api_key)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .timeout(Duration::from_millis(self.config.timeout_ms))
    }

    /// Send a request and decode a JSON body, labelling failures with `wrap`.
    async fn fetch<T>(
        &self,
        request: reqwest::RequestBuilder,
        wrap: fn(String) -> RetrievalError,
    ) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = request.send().await.map_err(|e| wrap(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(wrap(format!("status {}: {body}", status.as_u16())));
        }

        response.json().await.map_err(|e| wrap(e.to_string()))
    }
}

/// A PostgREST filter value in double quotes, with `\` and `"` escaped.
fn quote_value(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// PostgREST `in.(...)` filter with each id quoted.
fn in_filter(ids: &[String]) -> String {
    let quoted: Vec<String> = ids.iter().map(|id| quote_value(id)).collect();
    format!("in.({})", quoted.join(","))
}

/// PostgREST `eq.` filter with the value quoted.
fn eq_filter(value: &str) -> String {
    format!("eq.{}", quote_value(value))
}

#[async_trait]
impl VectorIndex for RestStore {
    async fn search(
        &self,
        tenant_key: &str,
        query_vector: &[f32],
        threshold: f32,
        match_count: usize,
    ) -> Result<Vec<ChunkHit>> {
        let body = MatchRequest {
            tenant_key,
            query_embedding: query_vector,
            match_threshold: threshold,
            match_count,
        };
        let path = format!("rpc/{}", self.config.match_function);

        let rows: Vec<MatchRow> = self
            .fetch(self.request(reqwest::Method::POST, &path).json(&body), RetrievalError::Index)
            .await?;

        debug!("Similarity RPC returned {} rows for {tenant_key}", rows.len());

        Ok(rows
            .into_iter()
            .map(|row| ChunkHit {
                chunk_id: row.chunk_id,
                document_id: row.document_id,
                content: row.content,
                score: row.score,
                url: row.url,
            })
            .collect())
    }
}

#[async_trait]
impl DocumentMetadataStore for RestStore {
    async fn titles(&self, document_ids: &[String]) -> Result<Vec<DocumentTitle>> {
        if document_ids.is_empty() {
            return Ok(Vec::new());
        }

        let filter = in_filter(document_ids);
        let request = self
            .request(reqwest::Method::GET, &self.config.documents_table)
            .query(&[("select", "id,title"), ("id", filter.as_str())]);

        self.fetch(request, RetrievalError::Metadata).await
    }
}

#[async_trait]
impl IdentityResolver for RestStore {
    async fn owner_for(&self, workspace_id: &str) -> Result<Option<String>> {
        let filter = eq_filter(workspace_id);
        let request = self
            .request(reqwest::Method::GET, &self.config.workspaces_table)
            .query(&[("select", "owner_id"), ("id", filter.as_str()), ("limit", "1")]);

        let rows: Vec<WorkspaceRow> = self
            .fetch(request, RetrievalError::IdentityResolution)
            .await?;
        Ok(rows.into_iter().next().and_then(|row| row.owner_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_in_filter_quotes_ids() {
        let ids = vec!["a".to_string(), "b,c".to_string()];
        assert_eq!(in_filter(&ids), r#"in.("a","b,c")"#);
    }

    #[test]
    fn test_filter_values_are_escaped() {
        let ids = vec![r#"a\b"c"#.to_string(), "x)".to_string()];
        assert_eq!(in_filter(&ids), r#"in.("a\\b\"c","x)")"#);
        assert_eq!(eq_filter("ws-1"), r#"eq."ws-1""#);
        assert_eq!(eq_filter(r#"ws,1\"#), r#"eq."ws,1\\""#);
    }

    #[test]
    fn test_url_building() {
        let store = RestStore::new(RestStoreConfig {
            base_url: "https://db.example.com/".to_string(),
            ..RestStoreConfig::default()
        });
        assert_eq!(
            store.url("rpc/match_document_chunks"),
            "https://db.example.com/rest/v1/rpc/match_document_chunks"
        );
    }
}
