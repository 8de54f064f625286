//! Scored multi-source reference resolution.
//!
//! `resolve` substitutes concrete values for reference expressions
//! ("it", "the first one", "same as before", "the cheaper one") drawn from
//! the session's cart and history. It is total: it never fails and never
//! drops an entity — anything unresolvable passes through untouched.

pub mod candidates;
pub mod comparative;
pub mod patterns;

pub use candidates::{CandidateSource, ResolutionCandidate};
pub use patterns::{Reference, ReferenceKind, ReferencePatterns};

use std::sync::Arc;

use crate::catalog::ProductCatalog;
use crate::config::ResolverConfig;
use crate::context::ConversationContext;
use crate::domain::Entity;

/// Resolves entity references using conversation context and cart state.
pub struct ReferenceResolver {
    patterns: ReferencePatterns,
    config: ResolverConfig,
    catalog: Option<Arc<dyn ProductCatalog>>,
}

impl ReferenceResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self {
            patterns: ReferencePatterns::new(),
            config,
            catalog: None,
        }
    }

    /// A resolver with a catalog handle upgrades comparative references to
    /// live product lookups.
    pub fn with_catalog(config: ResolverConfig, catalog: Arc<dyn ProductCatalog>) -> Self {
        Self {
            patterns: ReferencePatterns::new(),
            config,
            catalog: Some(catalog),
        }
    }

    /// Resolve references in the given entities against the session
    /// context. Returns at least as many entities as it was given;
    /// unresolved entities keep their original value and confidence.
    pub async fn resolve(
        &self,
        entities: &[Entity],
        context: &ConversationContext,
    ) -> Vec<Entity> {
        if entities.is_empty() {
            return Vec::new();
        }

        let references = self.patterns.detect(entities);
        let mut resolved = Vec::with_capacity(entities.len());

        for entity in entities {
            // Cross-command phrases recall a whole prior command and may
            // expand one entity into several.
            if comparative::is_cross_command_reference(entity, &self.config.vocabulary) {
                if let Some(recalled) = comparative::resolve_cross_command(entity, context) {
                    tracing::debug!(
                        phrase = %entity.value,
                        recalled = recalled.len(),
                        "Cross-command reference resolved"
                    );
                    resolved.extend(recalled);
                    continue;
                }
                resolved.push(entity.clone());
                continue;
            }

            if comparative::is_comparative_reference(entity, &self.config.vocabulary) {
                if let Some(substituted) = comparative::resolve_comparative(
                    entity,
                    context,
                    self.catalog.as_deref(),
                )
                .await
                {
                    resolved.push(substituted);
                    continue;
                }
                resolved.push(entity.clone());
                continue;
            }

            match self.resolve_scored(entity, &references, context) {
                Some(substituted) => resolved.push(substituted),
                None => resolved.push(entity.clone()),
            }
        }

        resolved
    }

    /// Scored resolution of one referencing entity. `None` when the entity
    /// holds no reference or no candidate clears the threshold.
    fn resolve_scored(
        &self,
        entity: &Entity,
        references: &[Reference],
        context: &ConversationContext,
    ) -> Option<Entity> {
        let reference = references.iter().find(|r| r.overlaps(entity.span))?;

        let mut collected = Vec::new();
        if let Some(cart) = &context.cart_state {
            if !cart.items.is_empty() {
                collected.extend(candidates::cart_candidates(reference, cart));
            }
        }
        if !context.command_history.is_empty() {
            collected.extend(candidates::history_candidates(reference, context, &self.config));
        }
        if collected.is_empty() {
            return None;
        }

        let ranked = candidates::score_candidates(reference, collected, &self.config);
        let best = &ranked[0];
        if best.score < self.config.acceptance_threshold {
            tracing::debug!(
                reference = %reference.text,
                score = best.score,
                "Best candidate under threshold, passing through"
            );
            return None;
        }

        tracing::debug!(
            reference = %reference.text,
            value = %best.entity.value,
            score = best.score,
            reason = %best.reason,
            "Reference resolved"
        );
        Some(best.entity.clone())
    }
}
