//! Compiled question patterns for direct matches.

use regex::{Regex, RegexBuilder};
use tracing::warn;

use crate::error::CatalogError;

#[derive(Debug, Clone)]
struct CompiledPattern {
    source: String,
    regex: Regex,
}

/// The compiled, ordered question patterns of one entry.
///
/// Matching is case-insensitive over Unicode simple case folding and
/// unanchored unless a pattern anchors itself. Patterns that fail to compile
/// are left out of the set.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<CompiledPattern>,
}

impl PatternSet {
    /// Compile `sources` in order.
    ///
    /// Returns the usable set together with one `InvalidPattern` diagnostic per
    /// pattern that was skipped.
    pub fn compile(entry_id: &str, sources: &[String]) -> (Self, Vec<CatalogError>) {
        let mut patterns = Vec::with_capacity(sources.len());
        let mut skipped = Vec::new();

        for source in sources {
            match RegexBuilder::new(source).case_insensitive(true).build() {
                Ok(regex) => patterns.push(CompiledPattern {
                    source: source.clone(),
                    regex,
                }),
                Err(err) => {
                    warn!("Skipping invalid pattern {source:?} in entry {entry_id}: {err}");
                    skipped.push(CatalogError::InvalidPattern {
                        entry_id: entry_id.to_string(),
                        pattern: source.clone(),
                        message: err.to_string(),
                    });
                }
            }
        }

        (Self { patterns }, skipped)
    }

    /// Source text of the first pattern matching `input`.
    pub fn first_match(&self, input: &str) -> Option<&str> {
        self.patterns
            .iter()
            .find(|p| p.regex.is_match(input))
            .map(|p| p.source.as_str())
    }

    /// Whether any pattern matches `input`.
    pub fn is_match(&self, input: &str) -> bool {
        self.first_match(input).is_some()
    }

    /// Number of usable patterns.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Whether no usable pattern remains.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sources(patterns: &[&str]) -> Vec<String> {
        patterns.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_case_insensitive_unanchored() {
        let (set, skipped) =
            PatternSet::compile("pricing", &sources(&[r"pricing\s+plans?|how\s+much"]));
        assert!(skipped.is_empty());
        assert!(set.is_match("So... HOW MUCH does it cost?"));
        assert!(set.is_match("show me your Pricing Plans"));
        assert!(!set.is_match("what does it do"));
    }

    #[test]
    fn test_case_folding_covers_non_ascii() {
        let (set, skipped) = PatternSet::compile("sizes", &sources(&["größe|café|über uns"]));
        assert!(skipped.is_empty());
        assert!(set.is_match("welche größe"));
        assert!(set.is_match("WELCHE GRÖẞE"));
        assert!(set.is_match("ZUM CAFÉ"));
        assert!(set.is_match("Über Uns"));
        assert!(!set.is_match("zum cafe"));
    }

    #[test]
    fn test_anchored_pattern_respected() {
        let (set, _) = PatternSet::compile("greeting", &sources(&[r"^hi\b"]));
        assert!(set.is_match("Hi there"));
        assert!(!set.is_match("well hi there"));
    }

    #[test]
    fn test_first_match_in_order() {
        let (set, _) = PatternSet::compile("refund", &sources(&["refund", "money back"]));
        assert_eq!(set.first_match("refund my money back please"), Some("refund"));
        assert_eq!(set.first_match("can I get my money back"), Some("money back"));
    }

    #[test]
    fn test_invalid_pattern_skipped() {
        let (set, skipped) = PatternSet::compile("broken", &sources(&["(unclosed", "valid"]));

        assert_eq!(set.len(), 1);
        assert_eq!(skipped.len(), 1);
        assert!(matches!(
            &skipped[0],
            CatalogError::InvalidPattern { entry_id, pattern, .. }
                if entry_id == "broken" && pattern == "(unclosed"
        ));
        assert!(set.is_match("this is valid"));
    }
}
