//! Audit events emitted by the answer pipeline.

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::pipeline::NoAnswerReason;

/// What happened while resolving an utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// The knowledge catalog answered directly.
    KnowledgeMatched {
        entry_id: String,
        direct_pattern: bool,
        score: f32,
        truncated: bool,
    },

    /// Context chunks were retrieved for a generative answer.
    ContextRetrieved {
        chunk_count: usize,
        quality_heuristic_met: bool,
        top_score: Option<f32>,
    },

    /// Nothing usable was found.
    NoAnswer { reason: NoAnswerReason },

    /// The tenant exceeded its retrieval rate limit.
    RateLimited { retry_after_ms: u64 },
}

/// A scalar value attached to an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Primitive {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<bool> for Primitive {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Primitive {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Primitive {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Primitive {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Primitive {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// One pipeline event for a tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineEvent {
    #[serde(flatten)]
    pub kind: EventKind,

    pub tenant: String,

    pub at: DateTime<Utc>,

    /// Free-form attributes outside the known kinds.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Primitive>,
}

impl PipelineEvent {
    /// Create an event stamped now.
    pub fn new(tenant: impl Into<String>, kind: EventKind) -> Self {
        Self {
            kind,
            tenant: tenant.into(),
            at: Utc::now(),
            extra: BTreeMap::new(),
        }
    }

    /// Override the timestamp.
    pub fn with_timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.at = at;
        self
    }

    /// Attach an extra attribute.
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<Primitive>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Short name of the event kind.
    pub fn name(&self) -> &'static str {
        match self.kind {
            EventKind::KnowledgeMatched { .. } => "knowledge_matched",
            EventKind::ContextRetrieved { .. } => "context_retrieved",
            EventKind::NoAnswer { .. } => "no_answer",
            EventKind::RateLimited { .. } => "rate_limited",
        }
    }
}

/// Receives pipeline events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &PipelineEvent);
}

/// Logs events as JSON through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &PipelineEvent) {
        let payload = serde_json::to_string(event).unwrap_or_default();
        info!(
            target: "chatdesk::events",
            event = event.name(),
            tenant = %event.tenant,
            "{payload}"
        );
    }
}

/// Keeps events in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<PipelineEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events received so far, oldest first.
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: &PipelineEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone());
    }
}
