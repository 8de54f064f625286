//! Per-session cart transactions.
//!
//! A brief manager-wide lock guards only the session-handle map; each
//! session's cart lives behind its own async lock, so operations on
//! different sessions run in parallel while same-session calls serialize
//! in lock-acquisition order. Validation runs against a scratch copy and
//! the live cart is swapped only on success, so any failure leaves it
//! untouched.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;

use crate::catalog::ProductCatalog;
use crate::config::CartConfig;
use crate::domain::{CartItem, CartSummary};
use crate::error::EngineError;

use super::rules::CartRules;
use super::types::{AddItemSpec, CartOutcome, PriceConstraints, RemoveCriteria};

struct CartState {
    items: Vec<CartItem>,
    last_activity: DateTime<Utc>,
}

impl CartState {
    fn new() -> Self {
        Self {
            items: Vec::new(),
            last_activity: Utc::now(),
        }
    }

    fn touch(&mut self) {
        let now = Utc::now();
        if now > self.last_activity {
            self.last_activity = now;
        }
    }
}

/// Owns every session's cart lines and serializes mutations per session.
pub struct CartTransactionManager {
    sessions: parking_lot::Mutex<HashMap<String, Arc<tokio::sync::Mutex<CartState>>>>,
    rules: CartRules,
    config: CartConfig,
}

impl CartTransactionManager {
    pub fn new(config: CartConfig) -> Self {
        Self {
            sessions: parking_lot::Mutex::new(HashMap::new()),
            rules: CartRules::new(config.clone()),
            config,
        }
    }

    /// With a catalog handle, validation failures can suggest in-stock
    /// alternatives.
    pub fn with_catalog(config: CartConfig, catalog: Arc<dyn ProductCatalog>) -> Self {
        Self {
            sessions: parking_lot::Mutex::new(HashMap::new()),
            rules: CartRules::with_catalog(config.clone(), catalog),
            config,
        }
    }

    /// Fetch or create the session handle. The map lock is held only for
    /// the lookup itself.
    fn handle(&self, session_id: &str) -> Arc<tokio::sync::Mutex<CartState>> {
        let mut sessions = self.sessions.lock();
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(CartState::new())))
            .clone()
    }

    fn check_session_id(session_id: &str) -> Result<(), EngineError> {
        if session_id.is_empty() {
            return Err(EngineError::EmptySessionId);
        }
        Ok(())
    }

    /// Add items to a session's cart. Merges into an existing
    /// (product, size, color) line by summing quantities; appends a new
    /// line otherwise. Fails atomically: on any violation the cart is
    /// unchanged.
    pub async fn add_items(
        &self,
        session_id: &str,
        specs: Vec<AddItemSpec>,
    ) -> Result<CartOutcome, EngineError> {
        Self::check_session_id(session_id)?;
        if specs.is_empty() {
            return Err(EngineError::EmptyItemBatch);
        }

        let handle = self.handle(session_id);
        let mut state = handle.lock().await;
        state.touch();

        if let Err(violation) = self.rules.validate_add(&state.items, &specs).await {
            return Ok(CartOutcome::fail_with(violation.message, violation.suggestions));
        }

        // Apply against a scratch copy; swap in only when every merge
        // stays under the per-line cap.
        let mut scratch = state.items.clone();
        let mut added = Vec::new();
        for spec in specs {
            let existing = scratch.iter_mut().find(|item| {
                item.is_variant(&spec.product.id, spec.size.as_deref(), spec.color.as_deref())
            });
            match existing {
                Some(line) => {
                    let merged = line.quantity + spec.quantity;
                    if merged > self.config.max_item_quantity {
                        return Ok(CartOutcome::fail(format!(
                            "Cannot add {} more {}. Maximum {} per product.",
                            spec.quantity, spec.product.name, self.config.max_item_quantity
                        )));
                    }
                    line.quantity = merged;
                    added.push(format!("{} more {}", spec.quantity, spec.product.name));
                }
                None => {
                    added.push(format!("{} {}", spec.quantity, spec.product.name));
                    scratch.push(CartItem::new(
                        spec.product,
                        spec.quantity,
                        spec.size,
                        spec.color,
                    ));
                }
            }
        }

        state.items = scratch;
        let summary = CartSummary::from_items(state.items.clone());
        tracing::info!(session = session_id, added = added.len(), "Items added to cart");

        let message = if added.len() == 1 {
            format!("Added {} to your cart", added[0])
        } else {
            format!("Added {} items to your cart: {}", added.len(), added.join(", "))
        };
        Ok(CartOutcome::ok(message, summary))
    }

    /// Remove every line matching the criteria. Empty criteria match all
    /// lines (bulk remove).
    pub async fn remove_items(
        &self,
        session_id: &str,
        criteria: RemoveCriteria,
    ) -> Result<CartOutcome, EngineError> {
        Self::check_session_id(session_id)?;

        let handle = self.handle(session_id);
        let mut state = handle.lock().await;
        state.touch();

        if let Err(violation) = self.rules.validate_remove(&state.items, &criteria) {
            return Ok(CartOutcome::fail_with(violation.message, violation.suggestions));
        }

        let mut removed = Vec::new();
        state.items.retain(|item| {
            if criteria.matches(item) {
                removed.push(format!("{} {}", item.quantity, item.product.name));
                false
            } else {
                true
            }
        });

        let summary = CartSummary::from_items(state.items.clone());
        tracing::info!(session = session_id, removed = removed.len(), "Items removed from cart");

        let message = if removed.len() == 1 {
            format!("Removed {} from your cart", removed[0])
        } else {
            format!(
                "Removed {} items from your cart: {}",
                removed.len(),
                removed.join(", ")
            )
        };
        Ok(CartOutcome::ok(message, summary))
    }

    /// Set the quantity of the exact (product, size, color) line.
    /// Quantity 0 deletes the line.
    pub async fn update_item_quantity(
        &self,
        session_id: &str,
        product_id: &str,
        new_quantity: u32,
        size: Option<&str>,
        color: Option<&str>,
    ) -> Result<CartOutcome, EngineError> {
        Self::check_session_id(session_id)?;

        let handle = self.handle(session_id);
        let mut state = handle.lock().await;
        state.touch();

        let Some(index) = state
            .items
            .iter()
            .position(|item| item.is_variant(product_id, size, color))
        else {
            return Ok(CartOutcome::fail("Item not found in cart"));
        };

        let message = if new_quantity == 0 {
            let removed = state.items.remove(index);
            format!("Removed {} from your cart", removed.product.name)
        } else {
            if new_quantity > self.config.max_item_quantity {
                return Ok(CartOutcome::fail(format!(
                    "Maximum {} items per product",
                    self.config.max_item_quantity
                )));
            }
            let line = &mut state.items[index];
            let old_quantity = line.quantity;
            line.quantity = new_quantity;
            format!(
                "Updated {} quantity from {old_quantity} to {new_quantity}",
                line.product.name
            )
        };

        let summary = CartSummary::from_items(state.items.clone());
        Ok(CartOutcome::ok(message, summary))
    }

    /// Empty the cart. Fails softly when there is nothing to clear.
    pub async fn clear_cart(&self, session_id: &str) -> Result<CartOutcome, EngineError> {
        Self::check_session_id(session_id)?;

        let handle = self.handle(session_id);
        let mut state = handle.lock().await;
        state.touch();

        if state.items.is_empty() {
            return Ok(CartOutcome::fail("Your cart is already empty"));
        }

        let count = state.items.len();
        state.items.clear();
        tracing::info!(session = session_id, lines = count, "Cart cleared");
        Ok(CartOutcome::ok(
            format!("Cleared {count} items from your cart"),
            CartSummary::from_items(Vec::new()),
        ))
    }

    /// A fresh projection of the session's current lines.
    pub async fn summary(&self, session_id: &str) -> CartSummary {
        let handle = self.handle(session_id);
        let mut state = handle.lock().await;
        state.touch();
        CartSummary::from_items(state.items.clone())
    }

    /// Advisory check of the current cart against price limits.
    pub async fn validate_price_constraints(
        &self,
        session_id: &str,
        constraints: &PriceConstraints,
    ) -> Result<CartOutcome, EngineError> {
        Self::check_session_id(session_id)?;

        let handle = self.handle(session_id);
        let mut state = handle.lock().await;
        state.touch();

        if state.items.is_empty() {
            return Ok(CartOutcome::fail("Cart is empty - no price constraints to validate"));
        }

        let items = state.items.clone();
        let summary = CartSummary::from_items(items.clone());
        drop(state);

        match self.rules.validate_price_constraints(&items, constraints).await {
            Ok(()) => Ok(CartOutcome::ok("Cart meets all price constraints", summary)),
            Err(violation) => {
                let mut outcome =
                    CartOutcome::fail_with(violation.message, violation.suggestions);
                outcome.summary = Some(summary);
                Ok(outcome)
            }
        }
    }

    /// Drop cart state for a single session. Returns whether it existed.
    pub fn evict(&self, session_id: &str) -> bool {
        self.sessions.lock().remove(session_id).is_some()
    }

    /// Evict every session idle past the timeout and return their ids.
    pub async fn sweep_expired(&self) -> Vec<String> {
        let timeout = Duration::minutes(self.config.session_timeout_minutes as i64);
        let now = Utc::now();

        let handles: Vec<(String, Arc<tokio::sync::Mutex<CartState>>)> = {
            let sessions = self.sessions.lock();
            sessions
                .iter()
                .map(|(id, handle)| (id.clone(), handle.clone()))
                .collect()
        };

        let mut expired = Vec::new();
        for (session_id, handle) in handles {
            let state = handle.lock().await;
            if now - state.last_activity > timeout {
                expired.push(session_id);
            }
        }

        if !expired.is_empty() {
            let mut sessions = self.sessions.lock();
            for session_id in &expired {
                sessions.remove(session_id);
            }
            tracing::info!(evicted = expired.len(), "Expired carts swept");
        }

        expired
    }

    /// Number of sessions currently holding cart state.
    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }

    #[cfg(test)]
    fn backdate(&self, session_id: &str, minutes: i64) {
        let handle = self.handle(session_id);
        let mut state = handle.try_lock().unwrap();
        state.last_activity = Utc::now() - Duration::minutes(minutes);
    }
}
