//! Ambiguity detection and catalog validation.
//!
//! Ambiguities are advisory: they never block execution. The caller decides
//! whether to turn them into a clarification question.

pub mod catalog_check;

pub use catalog_check::{AttributeSuggestion, CatalogValidation, ProductSpec};

use serde::{Deserialize, Serialize};

use crate::config::{CatalogConfig, VocabularyConfig};
use crate::context::ConversationContext;
use crate::domain::{Entity, EntityType, IntentType};

/// How urgently a clarification is needed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguitySeverity {
    Low,
    Medium,
    High,
}

/// The four independent ambiguity conditions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguityKind {
    MissingEntities,
    ConflictingEntities,
    VagueReference,
    IncompleteSpecification,
}

/// One detected ambiguity with a ready-made clarification prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ambiguity {
    pub kind: AmbiguityKind,
    pub severity: AmbiguitySeverity,
    pub message: String,
    pub details: Vec<String>,
}

/// Flags missing, conflicting, or vague entities and validates resolved
/// specifications against the product catalog.
pub struct AmbiguityValidator {
    vocabulary: VocabularyConfig,
    pub(crate) catalog_config: CatalogConfig,
}

impl AmbiguityValidator {
    pub fn new(vocabulary: VocabularyConfig, catalog_config: CatalogConfig) -> Self {
        Self {
            vocabulary,
            catalog_config,
        }
    }

    /// Run all four ambiguity checks. Every check runs on every call; the
    /// result is advisory and never blocks the turn.
    pub fn detect_ambiguity(
        &self,
        intent_type: IntentType,
        entities: &[Entity],
        context: &ConversationContext,
    ) -> Vec<Ambiguity> {
        let mut ambiguities = Vec::new();

        if let Some(ambiguity) = self.check_missing_entities(intent_type, entities) {
            ambiguities.push(ambiguity);
        }
        if let Some(ambiguity) = self.check_conflicting_entities(entities) {
            ambiguities.push(ambiguity);
        }
        if let Some(ambiguity) = self.check_vague_references(entities, context) {
            ambiguities.push(ambiguity);
        }
        if let Some(ambiguity) = self.check_incomplete_specification(entities) {
            ambiguities.push(ambiguity);
        }

        ambiguities
    }

    /// Entity types an intent cannot act without.
    fn required_entity_types(intent_type: IntentType) -> &'static [EntityType] {
        match intent_type {
            IntentType::Add => &[EntityType::Product, EntityType::Quantity],
            IntentType::Remove | IntentType::Search => &[EntityType::Product],
            IntentType::Checkout | IntentType::Help | IntentType::Cancel => &[],
        }
    }

    fn check_missing_entities(
        &self,
        intent_type: IntentType,
        entities: &[Entity],
    ) -> Option<Ambiguity> {
        let present: Vec<EntityType> = entities.iter().map(|e| e.entity_type).collect();
        let missing: Vec<String> = Self::required_entity_types(intent_type)
            .iter()
            .copied()
            .filter(|required| !present.contains(required))
            .map(|t| t.to_string())
            .collect();

        (!missing.is_empty()).then(|| Ambiguity {
            kind: AmbiguityKind::MissingEntities,
            severity: AmbiguitySeverity::High,
            message: format!("Please specify {}", missing.join(", ")),
            details: missing,
        })
    }

    fn check_conflicting_entities(&self, entities: &[Entity]) -> Option<Ambiguity> {
        const CONSTRAINED: [EntityType; 4] = [
            EntityType::Color,
            EntityType::Size,
            EntityType::Material,
            EntityType::Brand,
        ];

        let mut details = Vec::new();
        for entity_type in CONSTRAINED {
            let mut values: Vec<String> = entities
                .iter()
                .filter(|e| e.entity_type == entity_type)
                .map(|e| e.value.to_lowercase())
                .collect();
            values.sort();
            values.dedup();
            if values.len() > 1 {
                details.push(format!(
                    "multiple {entity_type} values: {}",
                    values.join(", ")
                ));
            }
        }

        (!details.is_empty()).then(|| Ambiguity {
            kind: AmbiguityKind::ConflictingEntities,
            severity: AmbiguitySeverity::High,
            message: "Multiple conflicting values detected".to_string(),
            details,
        })
    }

    fn check_vague_references(
        &self,
        entities: &[Entity],
        context: &ConversationContext,
    ) -> Option<Ambiguity> {
        let cart_usable = context
            .cart_state
            .as_ref()
            .is_some_and(|cart| !cart.items.is_empty());
        if cart_usable {
            return None;
        }

        let vague: Vec<String> = entities
            .iter()
            .filter(|e| {
                self.vocabulary
                    .pronoun_words
                    .iter()
                    .any(|p| e.value.eq_ignore_ascii_case(p))
            })
            .map(|e| e.value.clone())
            .collect();

        (!vague.is_empty()).then(|| Ambiguity {
            kind: AmbiguityKind::VagueReference,
            severity: AmbiguitySeverity::Medium,
            message: "Some references are unclear — which item do you mean?".to_string(),
            details: vague,
        })
    }

    fn check_incomplete_specification(&self, entities: &[Entity]) -> Option<Ambiguity> {
        let present: Vec<EntityType> = entities.iter().map(|e| e.entity_type).collect();
        let clothing = entities.iter().any(|e| {
            e.entity_type == EntityType::Product && self.is_clothing_item(&e.value)
        });
        if !clothing {
            return None;
        }

        let mut missing = Vec::new();
        if !present.contains(&EntityType::Size) {
            missing.push("size".to_string());
        }
        if !present.contains(&EntityType::Color) {
            missing.push("color preference".to_string());
        }

        (!missing.is_empty()).then(|| Ambiguity {
            kind: AmbiguityKind::IncompleteSpecification,
            severity: AmbiguitySeverity::Low,
            message: format!("Product specification is incomplete: {}", missing.join(", ")),
            details: missing,
        })
    }

    fn is_clothing_item(&self, product_name: &str) -> bool {
        let name = product_name.to_lowercase();
        self.vocabulary
            .clothing_keywords
            .iter()
            .any(|keyword| name.contains(keyword.as_str()))
    }
}
