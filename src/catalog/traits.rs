//! Product catalog capability consumed by the engine.
//!
//! The catalog itself is an external collaborator; this trait is the seam.
//! Filters are an explicit struct rather than a string-keyed map so every
//! searchable field is enumerated at compile time.

use async_trait::async_trait;

use crate::domain::Product;

/// Typed search filters. Unset fields do not constrain the search; a fully
/// default value matches the whole catalog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFilters {
    /// Product name, matched fuzzily.
    pub name: Option<String>,
    /// Exact category (case-insensitive).
    pub category: Option<String>,
    /// Required available color.
    pub color: Option<String>,
    /// Required available size.
    pub size: Option<String>,
    /// Material substring (case-insensitive).
    pub material: Option<String>,
    /// Brand substring (case-insensitive).
    pub brand: Option<String>,
    /// Inclusive minimum price.
    pub price_min: Option<f64>,
    /// Inclusive maximum price.
    pub price_max: Option<f64>,
    /// Restrict to in-stock products.
    pub in_stock: Option<bool>,
    /// Maximum results to return. Default: `50`.
    pub limit: Option<usize>,
}

impl SearchFilters {
    /// True when no field constrains the result set (limit aside).
    pub fn is_unconstrained(&self) -> bool {
        self.name.is_none()
            && self.category.is_none()
            && self.color.is_none()
            && self.size.is_none()
            && self.material.is_none()
            && self.brand.is_none()
            && self.price_min.is_none()
            && self.price_max.is_none()
            && self.in_stock.is_none()
    }
}

/// Read-only product lookup capability.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Search products matching the filters, ranked by relevance.
    async fn search(&self, filters: &SearchFilters) -> Vec<Product>;

    /// Fuzzy search by free-text name/description.
    async fn fuzzy_search_by_name(&self, query: &str, limit: usize) -> Vec<Product>;

    /// Exact id lookup.
    async fn get_by_id(&self, product_id: &str) -> Option<Product>;

    /// The name of this catalog implementation.
    fn name(&self) -> &str;
}
