//! Deterministic answer selection over the knowledge catalog.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{CatalogEntry, KnowledgeCatalog};
use crate::entry::{MatchReason, MatchResult};
use crate::scoring::{
    FUZZY_BASE_SCORE, FUZZY_THRESHOLD, KeywordScore, KeywordScorer, MIN_KEYWORD_HITS,
};
use crate::tokenizer::{tokenize, uniq};

/// Answers longer than this many characters are truncated.
pub const MAX_ANSWER_LENGTH: usize = 1400;

/// Appended to truncated answers.
pub const TRUNCATION_SUFFIX: &str = "\n\n(Truncated) Ask for more detail.";

/// Configuration for the knowledge selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Minimum number of keyword hits for a fuzzy match.
    pub min_keyword_hits: usize,

    /// Minimum normalized keyword overlap (0.0 to 1.0).
    pub fuzzy_threshold: f32,

    /// Fuzzy score of a full overlap at neutral priority.
    pub fuzzy_base_score: f32,

    /// Maximum answer length in characters.
    pub max_answer_length: usize,

    /// Text appended to truncated answers.
    pub truncation_suffix: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            min_keyword_hits: MIN_KEYWORD_HITS,
            fuzzy_threshold: FUZZY_THRESHOLD,
            fuzzy_base_score: FUZZY_BASE_SCORE,
            max_answer_length: MAX_ANSWER_LENGTH,
            truncation_suffix: TRUNCATION_SUFFIX.to_string(),
        }
    }
}

impl SelectorConfig {
    /// Set the maximum answer length.
    pub fn with_max_answer_length(mut self, max: usize) -> Self {
        self.max_answer_length = max;
        self
    }

    /// Set the minimum keyword hits.
    pub fn with_min_keyword_hits(mut self, hits: usize) -> Self {
        self.min_keyword_hits = hits;
        self
    }

    fn scorer(&self) -> KeywordScorer {
        KeywordScorer {
            min_hits: self.min_keyword_hits,
            threshold: self.fuzzy_threshold,
            base_score: self.fuzzy_base_score,
        }
    }
}

/// Picks a catalog answer for an utterance.
///
/// Runs in two phases:
/// 1. **Pattern phase**: entries are scanned in catalog order and the first
///    entry with a matching question pattern wins with score 1.0.
/// 2. **Fuzzy phase**: every entry is keyword-scored and the best qualifying
///    entry wins; ties keep the earlier entry.
///
/// `select` returns `None` when neither phase qualifies, which callers treat as
/// "try the next stage" rather than an error.
#[derive(Debug, Clone)]
pub struct KnowledgeSelector {
    catalog: Arc<KnowledgeCatalog>,
    config: SelectorConfig,
}

impl KnowledgeSelector {
    /// Create a selector over `catalog`.
    pub fn new(catalog: Arc<KnowledgeCatalog>, config: SelectorConfig) -> Self {
        Self { catalog, config }
    }

    /// Create a selector with default thresholds.
    pub fn with_defaults(catalog: Arc<KnowledgeCatalog>) -> Self {
        Self::new(catalog, SelectorConfig::default())
    }

    /// The catalog being searched.
    pub fn catalog(&self) -> &Arc<KnowledgeCatalog> {
        &self.catalog
    }

    /// Select an answer for `input`.
    pub fn select(&self, input: &str) -> Option<MatchResult> {
        if let Some((entry, pattern)) = self.pattern_phase(input) {
            debug!("Direct pattern hit on entry {}", entry.entry().id);
            let reason = MatchReason::DirectPattern {
                pattern: pattern.to_string(),
            };
            return Some(self.finish(entry, true, 1.0, reason));
        }

        let (entry, scored) = self.fuzzy_phase(input)?;
        debug!(
            "Fuzzy hit on entry {} (score {:.3}, keywords {:?})",
            entry.entry().id,
            scored.score,
            scored.hits
        );
        let reason = MatchReason::KeywordOverlap {
            keywords: scored.hits,
            normalized_overlap: scored.normalized_overlap,
        };
        Some(self.finish(entry, false, scored.score, reason))
    }

    fn pattern_phase<'a>(&'a self, input: &str) -> Option<(&'a CatalogEntry, &'a str)> {
        self.catalog
            .entries()
            .find_map(|entry| entry.patterns().first_match(input).map(|p| (entry, p)))
    }

    fn fuzzy_phase(&self, input: &str) -> Option<(&CatalogEntry, KeywordScore)> {
        let tokens = uniq(tokenize(input));
        if tokens.is_empty() {
            return None;
        }
        let token_set: HashSet<&str> = tokens.iter().map(String::as_str).collect();
        let scorer = self.config.scorer();

        let mut best: Option<(&CatalogEntry, KeywordScore)> = None;
        for entry in self.catalog.entries() {
            let Some(scored) = scorer.score(&token_set, entry.keywords(), entry.entry().priority)
            else {
                continue;
            };
            // Strictly greater, so the earlier entry keeps a tie.
            if best.as_ref().is_none_or(|(_, b)| scored.score > b.score) {
                best = Some((entry, scored));
            }
        }
        best
    }

    fn finish(
        &self,
        entry: &CatalogEntry,
        direct_pattern: bool,
        score: f32,
        reason: MatchReason,
    ) -> MatchResult {
        let source = entry.entry();
        let max = self.config.max_answer_length;

        let (answer, truncated) = match &source.short {
            Some(short) if source.answer.chars().count() > max && short.chars().count() <= max => {
                (short.clone(), true)
            }
            _ => truncate_answer(&source.answer, max, &self.config.truncation_suffix),
        };

        MatchResult {
            id: source.id.clone(),
            answer,
            direct_pattern,
            score,
            truncated,
            reason,
        }
    }
}

/// Cut `answer` to `max_chars` characters and append `suffix`.
///
/// Returns the answer unchanged (and `false`) when it already fits.
pub fn truncate_answer(answer: &str, max_chars: usize, suffix: &str) -> (String, bool) {
    match answer.char_indices().nth(max_chars) {
        None => (answer.to_string(), false),
        Some((cut, _)) => {
            let mut truncated = answer[..cut].trim_end().to_string();
            truncated.push_str(suffix);
            (truncated, true)
        }
    }
}
