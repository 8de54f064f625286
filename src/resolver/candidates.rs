//! Candidate collection and scoring for reference resolution.
//!
//! Candidates come from two sources: the session's current cart lines and
//! the most recent history turns. Cart lines are the fresher truth and get
//! a source boost at scoring time.

use serde::{Deserialize, Serialize};

use super::patterns::{ordinal_position, Reference, ReferenceKind};
use crate::config::ResolverConfig;
use crate::context::ConversationContext;
use crate::domain::{CartSummary, Entity, EntityType};

/// Where a resolution candidate was drawn from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    Cart,
    History,
}

/// A scored guess at what a reference refers to. Ephemeral.
#[derive(Debug, Clone)]
pub struct ResolutionCandidate {
    pub entity: Entity,
    pub score: f64,
    pub reason: String,
    pub source: CandidateSource,
}

/// Collect candidates from the current cart lines.
///
/// Each line contributes a product candidate at base score 0.7, boosted for
/// an ordinal-position match and for clue overlap with the line's name,
/// color, or size. The line's color and size come along as weaker
/// candidates at 0.8x the line score.
pub fn cart_candidates(reference: &Reference, cart: &CartSummary) -> Vec<ResolutionCandidate> {
    let mut candidates = Vec::new();
    let cart_len = cart.items.len();

    for (position, item) in cart.items.iter().enumerate() {
        let mut score: f64 = 0.7;

        if reference.kind == ReferenceKind::Ordinal {
            for clue in &reference.context_clues {
                if let Some(expected) = ordinal_position(clue, cart_len) {
                    if position == expected {
                        score += 0.3;
                    }
                    break;
                }
            }
        }

        let name_lower = item.product.name.to_lowercase();
        for clue in &reference.context_clues {
            let clue = clue.to_lowercase();
            if name_lower.contains(&clue) {
                score += 0.2;
            }
            if item
                .color
                .as_deref()
                .is_some_and(|c| c.eq_ignore_ascii_case(&clue))
            {
                score += 0.2;
            }
            if item
                .size
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case(&clue))
            {
                score += 0.2;
            }
        }
        score = score.min(1.0);

        let product_span = (0, item.product.name.len());
        candidates.push(ResolutionCandidate {
            entity: Entity::new(EntityType::Product, item.product.name.clone(), 0.9, product_span),
            score,
            reason: format!("cart line {}: {}", position + 1, item.product.name),
            source: CandidateSource::Cart,
        });

        if let Some(color) = &item.color {
            candidates.push(ResolutionCandidate {
                entity: Entity::new(EntityType::Color, color.clone(), 0.9, (0, color.len())),
                score: score * 0.8,
                reason: format!("color from cart: {color}"),
                source: CandidateSource::Cart,
            });
        }
        if let Some(size) = &item.size {
            candidates.push(ResolutionCandidate {
                entity: Entity::new(EntityType::Size, size.clone(), 0.9, (0, size.len())),
                score: score * 0.8,
                reason: format!("size from cart: {size}"),
                source: CandidateSource::Cart,
            });
        }
    }

    candidates
}

/// Collect candidates from the most recent history turns.
///
/// Scores decay linearly with recency; entities from successful turns are
/// boosted, failed turns penalized. Weak candidates (below 0.3) are
/// discarded.
pub fn history_candidates(
    reference: &Reference,
    context: &ConversationContext,
    config: &ResolverConfig,
) -> Vec<ResolutionCandidate> {
    let mut candidates = Vec::new();
    let recent = context.recent_commands(config.history_window);

    // Newest first: step 0 is the latest turn.
    for (step, command) in recent.iter().rev().enumerate() {
        let recency = 1.0 - step as f64 * config.recency_decay;
        let outcome_factor = if command.success {
            config.success_boost
        } else {
            config.failure_penalty
        };

        for entity in &command.entities {
            let relevance = history_relevance(reference, entity);
            let score = recency * relevance * outcome_factor;
            if score > 0.3 {
                let preview: String = command.original_text.chars().take(30).collect();
                candidates.push(ResolutionCandidate {
                    entity: entity.clone(),
                    score,
                    reason: format!("from turn: '{preview}'"),
                    source: CandidateSource::History,
                });
            }
        }
    }

    candidates
}

/// Relevance of a single history entity to the reference.
fn history_relevance(reference: &Reference, entity: &Entity) -> f64 {
    let mut score: f64 = 0.5;

    let value_lower = entity.value.to_lowercase();
    for clue in &reference.context_clues {
        if value_lower.contains(&clue.to_lowercase()) {
            score += 0.3;
        }
    }

    if reference.kind == ReferenceKind::Demonstrative
        && matches!(entity.entity_type, EntityType::Product | EntityType::Color)
    {
        score += 0.2;
    }

    score.min(1.0)
}

/// Apply the source boost and reference confidence, then rank best-first.
pub fn score_candidates(
    reference: &Reference,
    mut candidates: Vec<ResolutionCandidate>,
    config: &ResolverConfig,
) -> Vec<ResolutionCandidate> {
    for candidate in &mut candidates {
        if candidate.source == CandidateSource::Cart {
            candidate.score *= config.cart_source_boost;
        }
        candidate.score *= reference.confidence;
    }

    candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    candidates
}
