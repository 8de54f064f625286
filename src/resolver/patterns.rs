//! Reference-expression detection.
//!
//! Five pattern families, each with a base confidence and free-text clues
//! pulled from the capture groups. Families are checked most-specific
//! first, so "the first one" is an ordinal reference rather than a generic
//! demonstrative.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::Entity;

/// The kind of reference expression detected.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    /// it, that, them, those
    Pronoun,
    /// the red one, that blue one
    Demonstrative,
    /// the first one, the last
    Ordinal,
    /// the cheaper one, the largest
    Comparative,
    /// same, another, different
    Contextual,
}

/// A detected reference expression awaiting resolution. Ephemeral; lives
/// only for the duration of one `resolve` call.
#[derive(Debug, Clone)]
pub struct Reference {
    pub text: String,
    pub kind: ReferenceKind,
    /// Span of the entity the reference was found in.
    pub span: (usize, usize),
    pub confidence: f64,
    pub context_clues: Vec<String>,
}

impl Reference {
    /// Whether this reference overlaps the given entity span.
    pub fn overlaps(&self, span: (usize, usize)) -> bool {
        let (start, end) = span;
        (start <= self.span.0 && self.span.0 <= end) || (start <= self.span.1 && self.span.1 <= end)
    }
}

/// Compiled pattern families. Built once per resolver.
pub struct ReferencePatterns {
    patterns: Vec<(Regex, ReferenceKind, f64)>,
}

impl ReferencePatterns {
    pub fn new() -> Self {
        // Most-specific families first: ordinals and comparatives would
        // otherwise be swallowed by the demonstrative "the <word> one".
        let table: &[(&str, ReferenceKind, f64)] = &[
            (r"\b(it|that|this)\b", ReferenceKind::Pronoun, 0.9),
            (r"\b(them|those|these)\b", ReferenceKind::Pronoun, 0.85),
            (
                r"\bthe\s+(first|second|third|last)\s+one\b",
                ReferenceKind::Ordinal,
                0.9,
            ),
            (
                r"\bthe\s+(first|second|third|last)\b",
                ReferenceKind::Ordinal,
                0.85,
            ),
            (
                r"\bthe\s+(cheaper|expensive|larger|smaller)\s+one\b",
                ReferenceKind::Comparative,
                0.8,
            ),
            (
                r"\bthe\s+(cheapest|most\s+expensive|largest|smallest)\b",
                ReferenceKind::Comparative,
                0.85,
            ),
            (r"\bthe\s+(\w+)\s+one\b", ReferenceKind::Demonstrative, 0.8),
            (r"\bthat\s+(\w+)\s+one\b", ReferenceKind::Demonstrative, 0.85),
            (r"\b(same|similar)\b", ReferenceKind::Contextual, 0.7),
            (r"\b(another|different)\b", ReferenceKind::Contextual, 0.75),
        ];

        let patterns = table
            .iter()
            .map(|(pattern, kind, confidence)| {
                // The table is static and every entry compiles; a failure
                // here is a programmer error caught by the tests below.
                (Regex::new(pattern).expect("invalid reference pattern"), *kind, *confidence)
            })
            .collect();

        Self { patterns }
    }

    /// Detect reference expressions inside the given entities. An entity
    /// yields at most one reference: the first (most specific) family that
    /// matches its text.
    pub fn detect(&self, entities: &[Entity]) -> Vec<Reference> {
        let mut references = Vec::new();

        for entity in entities {
            let text = entity.value.to_lowercase();
            for (regex, kind, confidence) in &self.patterns {
                if let Some(captures) = regex.captures(&text) {
                    let matched = captures.get(0).map(|m| m.as_str().to_string()).unwrap_or_default();
                    let context_clues: Vec<String> = captures
                        .iter()
                        .skip(1)
                        .flatten()
                        .map(|g| g.as_str().to_string())
                        .collect();

                    references.push(Reference {
                        text: matched,
                        kind: *kind,
                        span: entity.span,
                        confidence: *confidence,
                        context_clues,
                    });
                    break;
                }
            }
        }

        references
    }
}

impl Default for ReferencePatterns {
    fn default() -> Self {
        Self::new()
    }
}

/// Cart position named by an ordinal clue, given the cart length.
/// Returns `None` for clues that are not ordinals or point past the cart.
pub fn ordinal_position(clue: &str, cart_len: usize) -> Option<usize> {
    if cart_len == 0 {
        return None;
    }
    let position = match clue {
        "first" => 0,
        "second" => 1,
        "third" => 2,
        "last" => cart_len - 1,
        _ => return None,
    };
    (position < cart_len).then_some(position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EntityType;

    fn entity(value: &str) -> Entity {
        Entity::new(EntityType::Product, value, 0.9, (0, value.len()))
    }

    #[test]
    fn detects_pronouns() {
        let patterns = ReferencePatterns::new();
        let refs = patterns.detect(&[entity("add it")]);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].kind, ReferenceKind::Pronoun);
        assert_eq!(refs[0].confidence, 0.9);
        assert_eq!(refs[0].context_clues, vec!["it".to_string()]);
    }

    #[test]
    fn ordinal_wins_over_demonstrative() {
        let patterns = ReferencePatterns::new();
        let refs = patterns.detect(&[entity("the first one")]);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].kind, ReferenceKind::Ordinal);
        assert_eq!(refs[0].context_clues, vec!["first".to_string()]);
    }

    #[test]
    fn comparative_wins_over_demonstrative() {
        let patterns = ReferencePatterns::new();
        let refs = patterns.detect(&[entity("the cheaper one")]);
        assert_eq!(refs[0].kind, ReferenceKind::Comparative);
    }

    #[test]
    fn demonstrative_extracts_clue() {
        let patterns = ReferencePatterns::new();
        let refs = patterns.detect(&[entity("the red one")]);
        assert_eq!(refs[0].kind, ReferenceKind::Demonstrative);
        assert_eq!(refs[0].context_clues, vec!["red".to_string()]);
        assert_eq!(refs[0].confidence, 0.8);
    }

    #[test]
    fn contextual_family() {
        let patterns = ReferencePatterns::new();
        let refs = patterns.detect(&[entity("another")]);
        assert_eq!(refs[0].kind, ReferenceKind::Contextual);
        assert_eq!(refs[0].confidence, 0.75);
    }

    #[test]
    fn plain_product_has_no_reference() {
        let patterns = ReferencePatterns::new();
        let refs = patterns.detect(&[entity("blue jeans")]);
        assert!(refs.is_empty());
    }

    #[test]
    fn one_reference_per_entity() {
        let patterns = ReferencePatterns::new();
        // Contains both a pronoun and an ordinal; only the first family hit
        // is reported.
        let refs = patterns.detect(&[entity("that the first one")]);
        assert_eq!(refs.len(), 1);
    }

    #[test]
    fn ordinal_positions() {
        assert_eq!(ordinal_position("first", 3), Some(0));
        assert_eq!(ordinal_position("second", 3), Some(1));
        assert_eq!(ordinal_position("third", 3), Some(2));
        assert_eq!(ordinal_position("last", 3), Some(2));
        assert_eq!(ordinal_position("third", 2), None);
        assert_eq!(ordinal_position("last", 0), None);
        assert_eq!(ordinal_position("red", 3), None);
    }

    #[test]
    fn base_confidences_stay_in_band() {
        let patterns = ReferencePatterns::new();
        for (_, _, confidence) in &patterns.patterns {
            assert!((0.7..=0.9).contains(confidence));
        }
    }
}
