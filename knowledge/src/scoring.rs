//! Fuzzy keyword scoring.
//!
//! An entry qualifies when at least `min_hits` of its keywords occur in the
//! input and the hits cover at least `threshold` of its keyword set. The score
//! is then boosted by priority and capped below 1.0, which is reserved for
//! direct pattern matches.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::tokenizer::tokenize;

/// Minimum number of keyword hits for a fuzzy match.
pub const MIN_KEYWORD_HITS: usize = 2;

/// Minimum fraction of an entry's keywords that must be hit.
pub const FUZZY_THRESHOLD: f32 = 0.33;

/// Score of a full keyword overlap at neutral priority.
pub const FUZZY_BASE_SCORE: f32 = 0.85;

/// Upper bound for fuzzy scores.
pub const MAX_FUZZY_SCORE: f32 = 0.99;

/// Score boost per priority level above 1.
pub const PRIORITY_BOOST: f32 = 0.15;

#[derive(Debug, Clone)]
struct Keyword {
    text: String,
    tokens: Vec<String>,
}

/// The lowercased, de-duplicated keywords of one entry.
///
/// A keyword is hit when every one of its tokens occurs in the input, so
/// multi-word keywords such as `"free trial"` work against tokenized input.
#[derive(Debug, Clone, Default)]
pub struct KeywordSet {
    keywords: Vec<Keyword>,
}

impl KeywordSet {
    /// Build a keyword set from raw catalog keywords.
    pub fn new(raw: &[String]) -> Self {
        let mut seen = HashSet::new();
        let keywords = raw
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty() && seen.insert(k.clone()))
            .map(|text| Keyword {
                tokens: tokenize(&text),
                text,
            })
            .collect();

        Self { keywords }
    }

    /// Number of distinct keywords.
    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    /// Keywords hit by `tokens`, in keyword order.
    pub fn hits(&self, tokens: &HashSet<&str>) -> Vec<String> {
        self.keywords
            .iter()
            .filter(|k| {
                !k.tokens.is_empty() && k.tokens.iter().all(|t| tokens.contains(t.as_str()))
            })
            .map(|k| k.text.clone())
            .collect()
    }
}

/// A qualifying fuzzy score for one entry.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordScore {
    /// Keywords that occurred in the input.
    pub hits: Vec<String>,

    /// `hits / |keywords|`.
    pub normalized_overlap: f32,

    /// Final score in `(0, MAX_FUZZY_SCORE]`.
    pub score: f32,
}

/// Scores keyword overlap between input tokens and entry keywords.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordScorer {
    /// Minimum number of keyword hits.
    pub min_hits: usize,

    /// Minimum normalized overlap.
    pub threshold: f32,

    /// Score of a full overlap at neutral priority.
    pub base_score: f32,
}

impl Default for KeywordScorer {
    fn default() -> Self {
        Self {
            min_hits: MIN_KEYWORD_HITS,
            threshold: FUZZY_THRESHOLD,
            base_score: FUZZY_BASE_SCORE,
        }
    }
}

impl KeywordScorer {
    /// Score an entry, or `None` if it fails either threshold.
    ///
    /// `tokens` must hold the unique normalized input tokens.
    pub fn score(
        &self,
        tokens: &HashSet<&str>,
        keywords: &KeywordSet,
        priority: u32,
    ) -> Option<KeywordScore> {
        if keywords.is_empty() {
            return None;
        }

        let hits = keywords.hits(tokens);
        if hits.len() < self.min_hits.max(1) {
            return None;
        }

        let normalized_overlap = hits.len() as f32 / keywords.len() as f32;
        if normalized_overlap < self.threshold {
            return None;
        }

        let score = (self.base_score * normalized_overlap * priority_multiplier(priority))
            .min(MAX_FUZZY_SCORE);

        Some(KeywordScore {
            hits,
            normalized_overlap,
            score,
        })
    }
}

/// `1 + (priority - 1) * PRIORITY_BOOST`.
pub fn priority_multiplier(priority: u32) -> f32 {
    1.0 + priority.saturating_sub(1) as f32 * PRIORITY_BOOST
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn keywords(raw: &[&str]) -> KeywordSet {
        let raw: Vec<String> = raw.iter().map(ToString::to_string).collect();
        KeywordSet::new(&raw)
    }

    fn token_set<'a>(tokens: &'a [String]) -> HashSet<&'a str> {
        tokens.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_keyword_set_lowercases_and_dedups() {
        let set = keywords(&["Leads", "leads", " Capture ", ""]);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_single_hit_rejected() {
        let tokens = tokenize("what about leads");
        let set = keywords(&["leads", "capture"]);
        let result = KeywordScorer::default().score(&token_set(&tokens), &set, 1);
        assert_eq!(result, None);
    }

    #[test]
    fn test_low_overlap_rejected() {
        let tokens = tokenize("leads capture");
        let set = keywords(&["leads", "capture", "a", "b", "c", "d", "e"]);
        // 2 / 7 < 0.33
        assert_eq!(KeywordScorer::default().score(&token_set(&tokens), &set, 1), None);
    }

    #[test]
    fn test_score_formula() {
        let tokens = tokenize("leads capture");
        let set = keywords(&["leads", "capture", "conversion", "visitors"]);

        let result = KeywordScorer::default().score(&token_set(&tokens), &set, 1).unwrap();
        assert_eq!(result.hits, vec!["leads".to_string(), "capture".to_string()]);
        assert!((result.normalized_overlap - 0.5).abs() < 1e-6);
        assert!((result.score - 0.425).abs() < 1e-6);

        let boosted = KeywordScorer::default().score(&token_set(&tokens), &set, 3).unwrap();
        assert!((boosted.score - 0.425 * 1.3).abs() < 1e-6);
    }

    #[test]
    fn test_higher_priority_scores_strictly_higher() {
        let tokens = tokenize("leads capture conversion");
        let set = keywords(&["leads", "capture", "conversion", "visitors", "widget"]);
        let scorer = KeywordScorer::default();

        let low = scorer.score(&token_set(&tokens), &set, 1).unwrap();
        let high = scorer.score(&token_set(&tokens), &set, 2).unwrap();
        assert!(high.score > low.score);
    }

    #[test]
    fn test_score_capped_below_one() {
        let tokens = tokenize("leads capture");
        let set = keywords(&["leads", "capture"]);
        let result = KeywordScorer::default().score(&token_set(&tokens), &set, 10).unwrap();
        assert_eq!(result.score, MAX_FUZZY_SCORE);
    }

    #[test]
    fn test_multi_word_keyword() {
        let tokens = tokenize("is there a trial that is free, no card?");
        let set = keywords(&["free trial", "card"]);
        let result = KeywordScorer::default().score(&token_set(&tokens), &set, 1).unwrap();
        assert_eq!(result.hits, vec!["free trial".to_string(), "card".to_string()]);
    }
}
