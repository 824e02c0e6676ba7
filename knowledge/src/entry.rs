//! Knowledge entries and selection results.

use serde::{Deserialize, Serialize};

fn default_priority() -> u32 {
    1
}

/// A curated question/answer record from the static catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    /// Unique key.
    pub id: String,

    /// Ordered regular expressions; the first one that matches wins.
    #[serde(default, alias = "questionPatterns")]
    pub question_patterns: Vec<String>,

    /// Keywords used for fuzzy scoring.
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Full response text.
    pub answer: String,

    /// Optional abbreviated response.
    #[serde(default)]
    pub short: Option<String>,

    /// Boosts the fuzzy score; 1 is neutral.
    #[serde(default = "default_priority")]
    pub priority: u32,
}

impl KnowledgeEntry {
    /// Create an entry with no patterns or keywords and neutral priority.
    pub fn new(id: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            question_patterns: Vec::new(),
            keywords: Vec::new(),
            answer: answer.into(),
            short: None,
            priority: 1,
        }
    }

    /// Append a question pattern.
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.question_patterns.push(pattern.into());
        self
    }

    /// Set the keyword list.
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// Set the abbreviated answer.
    pub fn with_short(mut self, short: impl Into<String>) -> Self {
        self.short = Some(short.into());
        self
    }

    /// Set the priority.
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }
}

/// Why an entry was selected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum MatchReason {
    /// A question pattern matched the raw input.
    DirectPattern { pattern: String },

    /// Enough keywords overlapped with the input tokens.
    KeywordOverlap {
        keywords: Vec<String>,
        normalized_overlap: f32,
    },
}

/// The answer chosen by the knowledge selector for one utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Id of the source entry.
    pub id: String,

    /// Answer text, possibly truncated.
    pub answer: String,

    /// Whether a question pattern matched.
    pub direct_pattern: bool,

    /// Confidence in `[0, 1]`; exactly 1.0 only for direct pattern hits.
    pub score: f32,

    /// Whether `answer` was shortened.
    pub truncated: bool,

    /// Explanation of the match.
    pub reason: MatchReason,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_entry_builder() {
        let entry = KnowledgeEntry::new("pricing", "Plans start at $29/mo.")
            .with_pattern(r"how\s+much")
            .with_keywords(["price", "plan"])
            .with_short("From $29/mo.")
            .with_priority(2);

        assert_eq!(entry.question_patterns, vec![r"how\s+much".to_string()]);
        assert_eq!(entry.keywords, vec!["price".to_string(), "plan".to_string()]);
        assert_eq!(entry.short.as_deref(), Some("From $29/mo."));
        assert_eq!(entry.priority, 2);
    }

    #[test]
    fn test_entry_deserialize_defaults() {
        let entry: KnowledgeEntry = serde_json::from_str(
            r#"{"id": "hours", "questionPatterns": ["opening hours"], "answer": "9 to 5"}"#,
        )
        .unwrap();

        assert_eq!(entry.priority, 1);
        assert!(entry.keywords.is_empty());
        assert_eq!(entry.question_patterns, vec!["opening hours".to_string()]);
    }
}
