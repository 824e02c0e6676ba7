//! Configuration for retrieval and the answer pipeline.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use chatdesk_embeddings::{EmbeddingProvider, OpenAIProvider, StaticProvider};
use chatdesk_knowledge::SelectorConfig;

use crate::error::Result;
use crate::types::VectorChunk;

/// Default number of chunks requested per retrieval.
pub const DEFAULT_TOP_K: usize = 6;

/// Chunks scoring below this similarity are noise.
pub const MIN_SIMILARITY: f32 = 0.30;

/// Top-level configuration for the answer pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Knowledge selector thresholds.
    pub selector: SelectorConfig,

    /// Vector retrieval configuration.
    pub retrieval: RetrievalConfig,

    /// Embedding provider configuration.
    pub embedding: EmbeddingConfig,

    /// Per-tenant rate limit on the retrieval stage.
    pub rate_limit: RateLimitConfig,
}

impl PipelineConfig {
    /// Parse a TOML configuration; missing sections keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load a TOML configuration file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded pipeline configuration from {}", path.display());
        Ok(config)
    }

    /// Set the retrieval configuration.
    pub fn with_retrieval(mut self, config: RetrievalConfig) -> Self {
        self.retrieval = config;
        self
    }

    /// Set the selector configuration.
    pub fn with_selector(mut self, config: SelectorConfig) -> Self {
        self.selector = config;
        self
    }

    /// Set the rate limit configuration.
    pub fn with_rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.rate_limit = config;
        self
    }
}

/// Configuration for vector retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of chunks to request.
    pub top_k: usize,

    /// Minimum similarity for a chunk to be kept.
    pub min_similarity: f32,

    /// When retrieved chunks are good enough to answer from.
    pub quality: QualityPolicy,

    /// Time budget for the query embedding (milliseconds).
    pub embed_timeout_ms: u64,

    /// Time budget for the similarity query and title lookup (milliseconds).
    pub query_timeout_ms: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            min_similarity: MIN_SIMILARITY,
            quality: QualityPolicy::NonEmpty,
            embed_timeout_ms: 8_000,
            query_timeout_ms: 5_000,
        }
    }
}

impl RetrievalConfig {
    /// Set the quality policy.
    pub fn with_quality(mut self, quality: QualityPolicy) -> Self {
        self.quality = quality;
        self
    }

    /// Set the minimum similarity.
    pub fn with_min_similarity(mut self, min_similarity: f32) -> Self {
        self.min_similarity = min_similarity;
        self
    }

    /// Set both network time budgets.
    pub fn with_timeouts(mut self, embed: Duration, query: Duration) -> Self {
        self.embed_timeout_ms = embed.as_millis() as u64;
        self.query_timeout_ms = query.as_millis() as u64;
        self
    }

    pub fn embed_timeout(&self) -> Duration {
        Duration::from_millis(self.embed_timeout_ms)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

/// Decides whether filtered chunks can support a generative answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum QualityPolicy {
    /// At least one chunk survived the similarity filter.
    #[default]
    NonEmpty,

    /// The best `top_n` scores add up to at least `min_sum`.
    TopScoreSum { top_n: usize, min_sum: f32 },
}

impl QualityPolicy {
    /// Evaluate the policy over chunks sorted by descending score.
    pub fn is_met(&self, chunks: &[VectorChunk]) -> bool {
        match self {
            Self::NonEmpty => !chunks.is_empty(),
            Self::TopScoreSum { top_n, min_sum } => {
                !chunks.is_empty()
                    && chunks.iter().take(*top_n).map(|c| c.score).sum::<f32>() >= *min_sum
            }
        }
    }
}

/// Configuration for the embedding provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Which provider to use.
    pub provider: EmbeddingProviderType,

    /// Model to use for embeddings.
    pub model: Option<String>,

    /// Override for the API base URL.
    pub base_url: Option<String>,

    /// API key; falls back to `OPENAI_API_KEY`.
    pub api_key: Option<String>,

    /// Required output dimension.
    pub dimensions: Option<usize>,

    /// HTTP request timeout (milliseconds).
    pub timeout_ms: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderType::OpenAI,
            model: None,
            base_url: None,
            api_key: None,
            dimensions: None,
            timeout_ms: 8_000,
        }
    }
}

impl EmbeddingConfig {
    /// Construct the configured provider.
    pub fn build_provider(&self) -> Arc<dyn EmbeddingProvider> {
        match self.provider {
            EmbeddingProviderType::OpenAI => {
                let mut provider =
                    OpenAIProvider::new().with_timeout(Duration::from_millis(self.timeout_ms));
                if let Some(key) = &self.api_key {
                    provider = provider.with_api_key(key);
                }
                if let Some(url) = &self.base_url {
                    provider = provider.with_base_url(url);
                }
                if let Some(model) = &self.model {
                    provider = provider.with_model(model);
                }
                if let Some(dims) = self.dimensions {
                    provider = provider.with_dimensions(dims);
                }
                Arc::new(provider)
            }
            EmbeddingProviderType::None => Arc::new(StaticProvider::unavailable()),
        }
    }
}

/// Type of embedding provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProviderType {
    /// OpenAI-compatible embeddings API.
    #[serde(rename = "openai")]
    OpenAI,
    /// No embeddings; retrieval always reports context unavailable.
    None,
}

/// Per-tenant fixed-window rate limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,

    /// Requests allowed per window.
    pub max_requests: u32,

    /// Window length in seconds.
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 30,
            window_secs: 60,
        }
    }
}
