//! Session engine façade.
//!
//! Wires the turn flow end to end: intent + entities + session id go
//! through reference resolution, ambiguity detection, and catalog
//! validation into a typed cart mutation; the resulting summary is written
//! back into the session context and the turn appended to history. Also
//! owns the unified lifecycle sweeper that evicts expired cart and context
//! state together.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::ambiguity::{Ambiguity, AmbiguityValidator, CatalogValidation};
use crate::cart::{AddItemSpec, CartOutcome, CartTransactionManager, PriceConstraints, RemoveCriteria};
use crate::catalog::ProductCatalog;
use crate::config::Config;
use crate::context::{CommandRecord, ContextStore, ContextStoreStats, InMemoryContextStore};
use crate::domain::{CartSummary, Entity, EntityType, Intent, IntentType};
use crate::error::EngineError;
use crate::resolver::ReferenceResolver;

/// Everything a caller needs to respond to one turn. Response templating
/// stays outside; this carries the raw material.
#[derive(Debug)]
pub struct TurnOutcome {
    /// Entities after reference resolution.
    pub resolved_entities: Vec<Entity>,
    /// Advisory ambiguities; never block execution.
    pub ambiguities: Vec<Ambiguity>,
    /// Catalog validation, for intents that consulted the catalog.
    pub validation: Option<CatalogValidation>,
    /// The cart mutation result, for intents that mutate the cart.
    pub outcome: Option<CartOutcome>,
}

/// Merged engine-level statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStats {
    pub contexts: ContextStoreStats,
    pub cart_sessions: usize,
}

/// The conversational-commerce session engine.
pub struct SessionEngine {
    contexts: Arc<dyn ContextStore>,
    carts: CartTransactionManager,
    resolver: ReferenceResolver,
    validator: AmbiguityValidator,
    catalog: Arc<dyn ProductCatalog>,
    config: Config,
}

impl SessionEngine {
    pub fn new(config: Config, catalog: Arc<dyn ProductCatalog>) -> Self {
        let contexts: Arc<dyn ContextStore> =
            Arc::new(InMemoryContextStore::new(config.context.clone()));
        let carts = CartTransactionManager::with_catalog(config.cart.clone(), catalog.clone());
        let resolver = ReferenceResolver::with_catalog(config.resolver.clone(), catalog.clone());
        let validator =
            AmbiguityValidator::new(config.resolver.vocabulary.clone(), config.catalog.clone());

        Self {
            contexts,
            carts,
            resolver,
            validator,
            catalog,
            config,
        }
    }

    /// Resolve references in the entities against the session's context.
    pub async fn resolve(
        &self,
        session_id: &str,
        entities: &[Entity],
    ) -> Result<Vec<Entity>, EngineError> {
        let context = self
            .contexts
            .get_or_create(session_id)
            .await
            .map_err(|_| EngineError::EmptySessionId)?;
        Ok(self.resolver.resolve(entities, &context).await)
    }

    /// Advisory ambiguity checks for the session's current state.
    pub async fn detect_ambiguity(
        &self,
        session_id: &str,
        intent_type: IntentType,
        entities: &[Entity],
    ) -> Result<Vec<Ambiguity>, EngineError> {
        let context = self
            .contexts
            .get_or_create(session_id)
            .await
            .map_err(|_| EngineError::EmptySessionId)?;
        Ok(self
            .validator
            .detect_ambiguity(intent_type, entities, &context))
    }

    /// Validate entities against the catalog.
    pub async fn validate_against_catalog(&self, entities: &[Entity]) -> CatalogValidation {
        self.validator
            .validate_against_catalog(entities, self.catalog.as_ref())
            .await
    }

    /// Add items to the session's cart and write the summary back.
    pub async fn add_items(
        &self,
        session_id: &str,
        specs: Vec<AddItemSpec>,
    ) -> Result<CartOutcome, EngineError> {
        let outcome = self.carts.add_items(session_id, specs).await?;
        self.write_back(session_id, &outcome).await;
        Ok(outcome)
    }

    /// Remove matching items and write the summary back.
    pub async fn remove_items(
        &self,
        session_id: &str,
        criteria: RemoveCriteria,
    ) -> Result<CartOutcome, EngineError> {
        let outcome = self.carts.remove_items(session_id, criteria).await?;
        self.write_back(session_id, &outcome).await;
        Ok(outcome)
    }

    /// Update one line's quantity and write the summary back.
    pub async fn update_item_quantity(
        &self,
        session_id: &str,
        product_id: &str,
        new_quantity: u32,
        size: Option<&str>,
        color: Option<&str>,
    ) -> Result<CartOutcome, EngineError> {
        let outcome = self
            .carts
            .update_item_quantity(session_id, product_id, new_quantity, size, color)
            .await?;
        self.write_back(session_id, &outcome).await;
        Ok(outcome)
    }

    /// Clear the session's cart and write the summary back.
    pub async fn clear_cart(&self, session_id: &str) -> Result<CartOutcome, EngineError> {
        let outcome = self.carts.clear_cart(session_id).await?;
        self.write_back(session_id, &outcome).await;
        Ok(outcome)
    }

    /// Fresh projection of the session's cart.
    pub async fn cart_summary(&self, session_id: &str) -> CartSummary {
        self.carts.summary(session_id).await
    }

    /// Advisory price-constraint check of the current cart.
    pub async fn validate_price_constraints(
        &self,
        session_id: &str,
        constraints: &PriceConstraints,
    ) -> Result<CartOutcome, EngineError> {
        self.carts
            .validate_price_constraints(session_id, constraints)
            .await
    }

    /// The full turn flow for a classified intent.
    pub async fn handle_intent(
        &self,
        session_id: &str,
        intent: &Intent,
        original_text: &str,
        normalized_text: &str,
    ) -> Result<TurnOutcome, EngineError> {
        if session_id.is_empty() {
            return Err(EngineError::EmptySessionId);
        }
        let context = self
            .contexts
            .get_or_create(session_id)
            .await
            .map_err(|_| EngineError::EmptySessionId)?;

        let resolved = self.resolver.resolve(&intent.entities, &context).await;
        let ambiguities = self
            .validator
            .detect_ambiguity(intent.intent_type, &resolved, &context);

        let mut validation = None;
        let outcome = match intent.intent_type {
            IntentType::Add => {
                let checked = self.validate_against_catalog(&resolved).await;
                let result = if checked.valid {
                    let spec = build_add_spec(&checked, &resolved);
                    Some(self.carts.add_items(session_id, vec![spec]).await?)
                } else {
                    Some(CartOutcome::fail_with(
                        checked.issues.join("; "),
                        checked
                            .suggestions
                            .iter()
                            .map(|p| p.name.clone())
                            .collect(),
                    ))
                };
                validation = Some(checked);
                result
            }
            IntentType::Remove => {
                let criteria = build_remove_criteria(&resolved);
                Some(self.carts.remove_items(session_id, criteria).await?)
            }
            IntentType::Cancel => Some(self.carts.clear_cart(session_id).await?),
            IntentType::Search => {
                validation = Some(self.validate_against_catalog(&resolved).await);
                None
            }
            IntentType::Checkout | IntentType::Help => None,
        };

        let success = outcome.as_ref().map_or(true, |o| o.success);
        let response = outcome.as_ref().map(|o| o.message.clone()).unwrap_or_default();
        self.record_turn(
            session_id,
            original_text,
            normalized_text,
            intent.clone(),
            resolved.clone(),
            success,
            &response,
        )
        .await;

        tracing::info!(
            session = session_id,
            intent = %intent.intent_type,
            success,
            ambiguities = ambiguities.len(),
            "Turn handled"
        );

        Ok(TurnOutcome {
            resolved_entities: resolved,
            ambiguities,
            validation,
            outcome,
        })
    }

    /// Append the turn to history and snapshot the cart into the context.
    pub async fn record_turn(
        &self,
        session_id: &str,
        original_text: &str,
        normalized_text: &str,
        intent: Intent,
        entities: Vec<Entity>,
        success: bool,
        response: &str,
    ) {
        let record = CommandRecord {
            timestamp: chrono::Utc::now(),
            original_text: original_text.to_string(),
            normalized_text: normalized_text.to_string(),
            intent,
            entities,
            success,
            response: response.to_string(),
        };
        if let Err(error) = self.contexts.append_command(session_id, record).await {
            tracing::warn!(session = session_id, %error, "Failed to append turn");
        }
        let summary = self.carts.summary(session_id).await;
        if let Err(error) = self.contexts.update_cart(session_id, summary).await {
            tracing::warn!(session = session_id, %error, "Failed to write back cart state");
        }
    }

    async fn write_back(&self, session_id: &str, outcome: &CartOutcome) {
        if let Some(summary) = &outcome.summary {
            if let Err(error) = self.contexts.update_cart(session_id, summary.clone()).await {
                tracing::warn!(session = session_id, %error, "Failed to write back cart state");
            }
        }
    }

    /// One lifecycle sweep: evict expired carts, drop their contexts in
    /// the same pass (cart first, then context), then let the context
    /// store run its own throttled sweep for sessions that never held a
    /// cart.
    pub async fn sweep_once(&self) {
        let evicted = self.carts.sweep_expired().await;
        for session_id in &evicted {
            self.contexts.remove(session_id).await;
        }
        self.contexts.sweep_expired().await;
    }

    /// Spawn the background lifecycle sweeper. One task per engine;
    /// ticks every `cart.sweep_interval_seconds`.
    pub fn start_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        let period = std::time::Duration::from_secs(engine.config.cart.sweep_interval_seconds);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                engine.sweep_once().await;
            }
        })
    }

    /// Merged statistics across the context store and cart manager.
    pub async fn stats(&self) -> EngineStats {
        EngineStats {
            contexts: self.contexts.stats().await,
            cart_sessions: self.carts.session_count(),
        }
    }
}

/// Build the typed add spec from a validated catalog match plus the turn's
/// quantity and variant entities.
fn build_add_spec(validation: &CatalogValidation, entities: &[Entity]) -> AddItemSpec {
    let product = validation.matches[0].clone();
    let quantity = entities
        .iter()
        .find(|e| e.entity_type == EntityType::Quantity)
        .and_then(|e| e.value.parse::<u32>().ok())
        .unwrap_or(1);
    let size = entities
        .iter()
        .find(|e| e.entity_type == EntityType::Size)
        .map(|e| e.value.clone());
    let color = entities
        .iter()
        .find(|e| e.entity_type == EntityType::Color)
        .map(|e| e.value.clone());

    AddItemSpec::new(product, quantity).with_variant(size, color)
}

/// Build removal criteria from the turn's entities. No entities means
/// bulk removal.
fn build_remove_criteria(entities: &[Entity]) -> RemoveCriteria {
    RemoveCriteria {
        product_name: entities
            .iter()
            .find(|e| e.entity_type == EntityType::Product)
            .map(|e| e.value.clone()),
        product_id: None,
        color: entities
            .iter()
            .find(|e| e.entity_type == EntityType::Color)
            .map(|e| e.value.clone()),
        size: entities
            .iter()
            .find(|e| e.entity_type == EntityType::Size)
            .map(|e| e.value.clone()),
    }
}
