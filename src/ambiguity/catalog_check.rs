//! Catalog validation with filter relaxation.
//!
//! When a resolved specification matches nothing, filters are dropped one
//! at a time in a fixed priority order and the search re-run, then fuzzy
//! name search, then a same-category listing, then an arbitrary sample —
//! so the suggestion set is non-empty whenever the catalog is.

use serde::{Deserialize, Serialize};

use super::AmbiguityValidator;
use crate::catalog::{ProductCatalog, SearchFilters};
use crate::domain::{Entity, EntityType, Product};

/// Flat product specification assembled from a turn's entities.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductSpec {
    pub product: Option<String>,
    pub color: Option<String>,
    pub size: Option<String>,
    pub material: Option<String>,
    pub brand: Option<String>,
    pub quantity: Option<String>,
    pub price: Option<String>,
}

impl ProductSpec {
    /// Collapse entities into one spec. Later entities of a type win.
    pub fn from_entities(entities: &[Entity]) -> Self {
        let mut spec = Self::default();
        for entity in entities {
            let value = Some(entity.value.clone());
            match entity.entity_type {
                EntityType::Product => spec.product = value,
                EntityType::Color => spec.color = value,
                EntityType::Size => spec.size = value,
                EntityType::Material => spec.material = value,
                EntityType::Brand => spec.brand = value,
                EntityType::Quantity => spec.quantity = value,
                EntityType::Price => spec.price = value,
            }
        }
        spec
    }

    fn to_filters(&self) -> SearchFilters {
        SearchFilters {
            name: self.product.clone(),
            color: self.color.clone(),
            size: self.size.clone(),
            material: self.material.clone(),
            brand: self.brand.clone(),
            price_max: self.price.as_deref().and_then(|p| p.parse().ok()),
            ..Default::default()
        }
    }
}

/// An unavailable attribute together with what the catalog does offer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeSuggestion {
    pub attribute: String,
    pub available: Vec<String>,
}

/// Result of validating a specification against the catalog.
#[derive(Debug, Clone, Default)]
pub struct CatalogValidation {
    pub valid: bool,
    pub matches: Vec<Product>,
    pub suggestions: Vec<Product>,
    pub issues: Vec<String>,
    pub attribute_issues: Vec<String>,
    pub attribute_suggestions: Vec<AttributeSuggestion>,
}

impl AmbiguityValidator {
    /// Validate entities against the catalog, producing matches or a
    /// relaxed-filter suggestion set. Never fails.
    pub async fn validate_against_catalog(
        &self,
        entities: &[Entity],
        catalog: &dyn ProductCatalog,
    ) -> CatalogValidation {
        let mut result = CatalogValidation::default();
        let spec = ProductSpec::from_entities(entities);

        let Some(product_term) = spec.product.clone() else {
            result.issues.push("No product specified".to_string());
            return result;
        };

        let filters = spec.to_filters();
        let matches = catalog.search(&filters).await;

        if matches.is_empty() {
            result
                .issues
                .push("No matching products found".to_string());
            result.suggestions = self
                .relaxed_suggestions(&filters, &product_term, catalog)
                .await;
            return result;
        }

        result.valid = true;
        self.validate_attributes(&spec, &matches, &mut result);
        result.matches = matches;
        result
    }

    /// Relax filters one at a time in fixed priority, then fall through to
    /// progressively coarser lookups.
    async fn relaxed_suggestions(
        &self,
        filters: &SearchFilters,
        product_term: &str,
        catalog: &dyn ProductCatalog,
    ) -> Vec<Product> {
        let limit = self.catalog_config.suggestion_limit;
        let mut relaxed = filters.clone();

        // color -> size -> material -> max-price -> min-price -> brand
        if relaxed.color.take().is_some() {
            let results = catalog.search(&relaxed).await;
            if !results.is_empty() {
                return truncated(results, limit);
            }
        }
        if relaxed.size.take().is_some() {
            let results = catalog.search(&relaxed).await;
            if !results.is_empty() {
                return truncated(results, limit);
            }
        }
        if relaxed.material.take().is_some() {
            let results = catalog.search(&relaxed).await;
            if !results.is_empty() {
                return truncated(results, limit);
            }
        }
        if relaxed.price_max.take().is_some() {
            let results = catalog.search(&relaxed).await;
            if !results.is_empty() {
                return truncated(results, limit);
            }
        }
        if relaxed.price_min.take().is_some() {
            let results = catalog.search(&relaxed).await;
            if !results.is_empty() {
                return truncated(results, limit);
            }
        }
        if relaxed.brand.take().is_some() {
            let results = catalog.search(&relaxed).await;
            if !results.is_empty() {
                return truncated(results, limit);
            }
        }

        let fuzzy = catalog
            .fuzzy_search_by_name(product_term, self.catalog_config.fuzzy_limit)
            .await;
        if !fuzzy.is_empty() {
            return truncated(fuzzy, limit);
        }

        // The term may name a category rather than a product.
        let by_category = catalog
            .search(&SearchFilters {
                category: Some(product_term.to_string()),
                ..Default::default()
            })
            .await;
        if !by_category.is_empty() {
            return truncated(by_category, limit);
        }

        // Arbitrary sample; empty only when the whole catalog is.
        truncated(catalog.search(&SearchFilters::default()).await, limit)
    }

    /// Check requested color/size against the union of what the matched
    /// products actually offer.
    fn validate_attributes(
        &self,
        spec: &ProductSpec,
        matches: &[Product],
        result: &mut CatalogValidation,
    ) {
        if let Some(color) = &spec.color {
            if !matches.iter().any(|p| p.has_color(color)) {
                let mut available: Vec<String> = matches
                    .iter()
                    .flat_map(|p| p.colors.iter().cloned())
                    .collect();
                available.sort();
                available.dedup();
                result
                    .attribute_issues
                    .push(format!("Color '{color}' not available"));
                result.attribute_suggestions.push(AttributeSuggestion {
                    attribute: "color".to_string(),
                    available,
                });
            }
        }

        if let Some(size) = &spec.size {
            if !matches.iter().any(|p| p.has_size(size)) {
                let mut available: Vec<String> = matches
                    .iter()
                    .flat_map(|p| p.sizes.iter().cloned())
                    .collect();
                available.sort();
                available.dedup();
                result
                    .attribute_issues
                    .push(format!("Size '{size}' not available"));
                result.attribute_suggestions.push(AttributeSuggestion {
                    attribute: "size".to_string(),
                    available,
                });
            }
        }
    }
}

fn truncated(mut products: Vec<Product>, limit: usize) -> Vec<Product> {
    products.truncate(limit);
    products
}
