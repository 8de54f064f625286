//! Typed cart operation inputs and the shared operation outcome.
//!
//! Every operation names its fields explicitly; there are no string-keyed
//! criteria maps, so adding a field is a compile-time-visible change.

use serde::{Deserialize, Serialize};

use crate::domain::{CartItem, CartSummary, Product};

/// One item to add: a product at a quantity with optional variant
/// attributes.
#[derive(Debug, Clone)]
pub struct AddItemSpec {
    pub product: Product,
    pub quantity: u32,
    pub size: Option<String>,
    pub color: Option<String>,
}

impl AddItemSpec {
    pub fn new(product: Product, quantity: u32) -> Self {
        Self {
            product,
            quantity,
            size: None,
            color: None,
        }
    }

    pub fn with_variant(mut self, size: Option<String>, color: Option<String>) -> Self {
        self.size = size;
        self.color = color;
        self
    }
}

/// Sparse removal criteria. Unset fields do not constrain the match; a
/// fully default value matches every line (bulk remove).
#[derive(Debug, Clone, Default)]
pub struct RemoveCriteria {
    /// Case-insensitive substring of the product name.
    pub product_name: Option<String>,
    /// Exact product id.
    pub product_id: Option<String>,
    /// Exact line color (case-insensitive).
    pub color: Option<String>,
    /// Exact line size (case-insensitive).
    pub size: Option<String>,
}

impl RemoveCriteria {
    pub fn is_empty(&self) -> bool {
        self.product_name.is_none()
            && self.product_id.is_none()
            && self.color.is_none()
            && self.size.is_none()
    }

    /// Whether a cart line satisfies every set criterion.
    pub fn matches(&self, item: &CartItem) -> bool {
        if let Some(ref name) = self.product_name {
            if !item
                .product
                .name
                .to_lowercase()
                .contains(&name.to_lowercase())
            {
                return false;
            }
        }
        if let Some(ref id) = self.product_id {
            if item.product.id != *id {
                return false;
            }
        }
        if let Some(ref color) = self.color {
            match item.color.as_deref() {
                Some(line_color) if line_color.eq_ignore_ascii_case(color) => {}
                _ => return false,
            }
        }
        if let Some(ref size) = self.size {
            match item.size.as_deref() {
                Some(line_size) if line_size.eq_ignore_ascii_case(size) => {}
                _ => return false,
            }
        }
        true
    }
}

/// Advisory price limits for the current cart.
#[derive(Debug, Clone, Default)]
pub struct PriceConstraints {
    pub budget: Option<f64>,
    pub max_item_price: Option<f64>,
    pub min_item_price: Option<f64>,
}

/// Result of a cart operation. Expected business conditions come back as
/// `success == false` with a message and, where possible, suggestions —
/// never as an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartOutcome {
    pub success: bool,
    pub message: String,
    pub suggestions: Vec<String>,
    pub summary: Option<CartSummary>,
}

impl CartOutcome {
    pub fn ok(message: impl Into<String>, summary: CartSummary) -> Self {
        Self {
            success: true,
            message: message.into(),
            suggestions: Vec::new(),
            summary: Some(summary),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            suggestions: Vec::new(),
            summary: None,
        }
    }

    pub fn fail_with(message: impl Into<String>, suggestions: Vec<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            suggestions,
            summary: None,
        }
    }
}
