//! Text normalization for keyword scoring.

use std::collections::HashSet;

/// Split text into lowercase alphanumeric tokens.
///
/// Every non-alphanumeric character is a separator, runs of separators
/// collapse, and empty tokens are dropped.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Remove duplicate tokens, keeping the first occurrence of each.
pub fn uniq(tokens: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(tokens.len());
    tokens
        .into_iter()
        .filter(|token| seen.insert(token.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tokenize_lowercases_and_splits() {
        assert_eq!(
            tokenize("How much does it COST?"),
            vec!["how", "much", "does", "it", "cost"]
        );
    }

    #[test]
    fn test_tokenize_collapses_separators() {
        assert_eq!(
            tokenize("  leads---capture,,,  conversion!! "),
            vec!["leads", "capture", "conversion"]
        );
        assert!(tokenize("?!... ---").is_empty());
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn test_tokenize_keeps_digits() {
        assert_eq!(tokenize("plan B2B costs $49/mo"), vec!["plan", "b2b", "costs", "49", "mo"]);
    }

    #[test]
    fn test_uniq_preserves_first_seen_order() {
        let tokens = tokenize("leads capture leads visitors capture");
        assert_eq!(uniq(tokens), vec!["leads", "capture", "visitors"]);
    }
}
