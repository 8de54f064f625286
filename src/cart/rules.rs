//! Business-rule validation for cart operations.
//!
//! Rules are cart-level constraints independent of catalog inventory
//! (caps, distinct-product limits) plus availability checks against the
//! product itself. Violations carry concrete suggestions where the catalog
//! can provide them.

use std::sync::Arc;

use crate::catalog::{ProductCatalog, SearchFilters};
use crate::config::CartConfig;
use crate::domain::CartItem;

use super::types::{AddItemSpec, PriceConstraints, RemoveCriteria};

/// A failed business rule: message plus recovery suggestions.
#[derive(Debug, Clone)]
pub struct Violation {
    pub message: String,
    pub suggestions: Vec<String>,
}

impl Violation {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestions: Vec::new(),
        }
    }

    fn with(message: impl Into<String>, suggestions: Vec<String>) -> Self {
        Self {
            message: message.into(),
            suggestions,
        }
    }
}

/// Validates cart operations against business rules.
pub struct CartRules {
    config: CartConfig,
    catalog: Option<Arc<dyn ProductCatalog>>,
}

impl CartRules {
    pub fn new(config: CartConfig) -> Self {
        Self {
            config,
            catalog: None,
        }
    }

    /// With a catalog handle, out-of-stock violations suggest similar
    /// in-stock products.
    pub fn with_catalog(config: CartConfig, catalog: Arc<dyn ProductCatalog>) -> Self {
        Self {
            config,
            catalog: Some(catalog),
        }
    }

    /// Validate an add batch against the current cart. The cart itself is
    /// untouched; the manager applies the batch only on `Ok`.
    pub async fn validate_add(
        &self,
        current: &[CartItem],
        specs: &[AddItemSpec],
    ) -> Result<(), Violation> {
        // Aggregate quantity cap across the whole cart.
        let current_total: u32 = current.iter().map(|i| i.quantity).sum();
        let new_total: u32 = specs.iter().map(|s| s.quantity).sum();
        if current_total + new_total > self.config.max_cart_items {
            return Err(Violation::with(
                format!(
                    "Cart limit exceeded. Maximum {} items allowed.",
                    self.config.max_cart_items
                ),
                vec![
                    format!("Remove some items from your cart (currently {current_total} items)"),
                    "Reduce quantities of items you're adding".to_string(),
                    "Add items in smaller batches".to_string(),
                ],
            ));
        }

        // Distinct-product cap, counting the union of cart and batch.
        let mut distinct: Vec<&str> = current
            .iter()
            .map(|i| i.product.id.as_str())
            .chain(specs.iter().map(|s| s.product.id.as_str()))
            .collect();
        distinct.sort_unstable();
        distinct.dedup();
        if distinct.len() > self.config.max_distinct_products {
            return Err(Violation::with(
                format!(
                    "Maximum {} different products allowed per cart",
                    self.config.max_distinct_products
                ),
                vec![
                    "Remove some products from your cart".to_string(),
                    "Complete this purchase and start a new cart for additional items"
                        .to_string(),
                ],
            ));
        }

        for spec in specs {
            self.validate_item(spec).await?;
        }

        Ok(())
    }

    /// Per-item availability and quantity checks.
    async fn validate_item(&self, spec: &AddItemSpec) -> Result<(), Violation> {
        if spec.quantity == 0 {
            return Err(Violation::new("Quantity must be at least 1"));
        }
        if spec.quantity > self.config.max_item_quantity {
            return Err(Violation::with(
                format!(
                    "Quantity {} exceeds maximum limit",
                    spec.quantity
                ),
                vec![format!(
                    "Maximum {} items per product allowed",
                    self.config.max_item_quantity
                )],
            ));
        }

        let product = &spec.product;
        if !product.in_stock {
            let suggestions = self.similar_in_stock(product).await;
            return Err(Violation::with(
                format!("{} is currently out of stock", product.name),
                suggestions,
            ));
        }

        if let Some(ref size) = spec.size {
            if !product.has_size(size) {
                let available = if product.sizes.is_empty() {
                    "None".to_string()
                } else {
                    product.sizes.join(", ")
                };
                return Err(Violation::with(
                    format!("Size '{size}' is not available for {}", product.name),
                    vec![format!("Available sizes: {available}")],
                ));
            }
        }

        if let Some(ref color) = spec.color {
            if !product.has_color(color) {
                let available = if product.colors.is_empty() {
                    "None".to_string()
                } else {
                    product.colors.join(", ")
                };
                return Err(Violation::with(
                    format!("Color '{color}' is not available for {}", product.name),
                    vec![format!("Available colors: {available}")],
                ));
            }
        }

        Ok(())
    }

    /// Validate removal criteria against the current cart.
    pub fn validate_remove(
        &self,
        current: &[CartItem],
        criteria: &RemoveCriteria,
    ) -> Result<(), Violation> {
        if current.is_empty() {
            return Err(Violation::with(
                "Your cart is empty",
                vec!["Add some items to your cart first".to_string()],
            ));
        }

        if !current.iter().any(|item| criteria.matches(item)) {
            return Err(Violation::with(
                "No items found matching your criteria",
                removal_suggestions(current, criteria),
            ));
        }

        Ok(())
    }

    /// Advisory price-constraint check over the given lines.
    pub async fn validate_price_constraints(
        &self,
        items: &[CartItem],
        constraints: &PriceConstraints,
    ) -> Result<(), Violation> {
        let mut total_cost = 0.0;

        for item in items {
            total_cost += item.line_total();

            if let Some(max_price) = constraints.max_item_price {
                if item.unit_price > max_price {
                    let suggestions = self.cheaper_alternatives(item, max_price).await;
                    return Err(Violation::with(
                        format!(
                            "{} ({:.2}) exceeds maximum item price of {max_price:.2}",
                            item.product.name, item.unit_price
                        ),
                        suggestions,
                    ));
                }
            }
            if let Some(min_price) = constraints.min_item_price {
                if item.unit_price < min_price {
                    return Err(Violation::new(format!(
                        "{} ({:.2}) is below minimum item price of {min_price:.2}",
                        item.product.name, item.unit_price
                    )));
                }
            }
        }

        if let Some(budget) = constraints.budget {
            if total_cost > budget {
                let mut suggestions =
                    vec![format!("You're {:.2} over budget", total_cost - budget)];
                if let Some(most_expensive) = items
                    .iter()
                    .max_by(|a, b| a.line_total().total_cmp(&b.line_total()))
                {
                    suggestions.push(format!(
                        "Consider removing {} ({:.2})",
                        most_expensive.product.name,
                        most_expensive.line_total()
                    ));
                }
                suggestions.push("Reduce quantities of items".to_string());
                return Err(Violation::with(
                    format!("Total cost {total_cost:.2} exceeds budget of {budget:.2}"),
                    suggestions,
                ));
            }
        }

        Ok(())
    }

    async fn similar_in_stock(&self, product: &crate::domain::Product) -> Vec<String> {
        let Some(catalog) = &self.catalog else {
            return Vec::new();
        };
        let results = catalog
            .search(&SearchFilters {
                category: Some(product.category.clone()),
                in_stock: Some(true),
                limit: Some(3),
                ..Default::default()
            })
            .await;
        let names: Vec<String> = results
            .iter()
            .filter(|p| p.id != product.id)
            .map(|p| p.name.clone())
            .collect();
        if names.is_empty() {
            Vec::new()
        } else {
            vec![format!("Similar products available: {}", names.join(", "))]
        }
    }

    async fn cheaper_alternatives(&self, item: &CartItem, max_price: f64) -> Vec<String> {
        let Some(catalog) = &self.catalog else {
            return Vec::new();
        };
        let results = catalog
            .search(&SearchFilters {
                category: Some(item.product.category.clone()),
                price_max: Some(max_price),
                in_stock: Some(true),
                limit: Some(3),
                ..Default::default()
            })
            .await;
        let names: Vec<String> = results
            .iter()
            .filter(|p| p.id != item.product.id)
            .map(|p| format!("{} ({:.2})", p.name, p.price))
            .collect();
        if names.is_empty() {
            Vec::new()
        } else {
            vec![format!("Cheaper alternatives: {}", names.join(", "))]
        }
    }
}

/// What the cart actually holds, for "no match" failures.
fn removal_suggestions(current: &[CartItem], criteria: &RemoveCriteria) -> Vec<String> {
    let mut suggestions = Vec::new();

    let mut names: Vec<String> = current.iter().map(|i| i.product.name.clone()).collect();
    names.sort();
    names.dedup();
    if !names.is_empty() {
        suggestions.push(format!("Available products: {}", names.join(", ")));
    }

    if criteria.color.is_some() {
        let mut colors: Vec<String> = current.iter().filter_map(|i| i.color.clone()).collect();
        colors.sort();
        colors.dedup();
        if !colors.is_empty() {
            suggestions.push(format!("Available colors: {}", colors.join(", ")));
        }
    }

    if criteria.size.is_some() {
        let mut sizes: Vec<String> = current.iter().filter_map(|i| i.size.clone()).collect();
        sizes.sort();
        sizes.dedup();
        if !sizes.is_empty() {
            suggestions.push(format!("Available sizes: {}", sizes.join(", ")));
        }
    }

    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryProductCatalog;
    use crate::domain::Product;

    fn product(id: &str, name: &str, in_stock: bool) -> Product {
        Product {
            id: id.to_string(),
            name: name.to_string(),
            category: "clothing".to_string(),
            price: 20.0,
            sizes: vec!["S".to_string(), "M".to_string()],
            colors: vec!["red".to_string()],
            material: "cotton".to_string(),
            brand: "Acme".to_string(),
            in_stock,
            description: String::new(),
        }
    }

    fn rules() -> CartRules {
        CartRules::new(CartConfig::default())
    }

    #[tokio::test]
    async fn aggregate_cap_is_enforced() {
        let current = vec![CartItem::new(product("p1", "shirt", true), 45, None, None)];
        let specs = vec![AddItemSpec::new(product("p1", "shirt", true), 10)];
        let violation = rules().validate_add(&current, &specs).await.unwrap_err();
        assert!(violation.message.contains("Cart limit exceeded"));
        assert!(!violation.suggestions.is_empty());
    }

    #[tokio::test]
    async fn distinct_product_cap_is_enforced() {
        let current: Vec<CartItem> = (0..5)
            .map(|i| CartItem::new(product(&format!("p{i}"), "item", true), 1, None, None))
            .collect();
        let specs = vec![AddItemSpec::new(product("p5", "sixth", true), 1)];
        let violation = rules().validate_add(&current, &specs).await.unwrap_err();
        assert!(violation.message.contains("5 different products"));
    }

    #[tokio::test]
    async fn readding_existing_product_passes_distinct_cap() {
        let current: Vec<CartItem> = (0..5)
            .map(|i| CartItem::new(product(&format!("p{i}"), "item", true), 1, None, None))
            .collect();
        let specs = vec![AddItemSpec::new(product("p0", "item", true), 1)];
        assert!(rules().validate_add(&current, &specs).await.is_ok());
    }

    #[tokio::test]
    async fn zero_quantity_is_rejected() {
        let specs = vec![AddItemSpec::new(product("p1", "shirt", true), 0)];
        let violation = rules().validate_add(&[], &specs).await.unwrap_err();
        assert!(violation.message.contains("at least 1"));
    }

    #[tokio::test]
    async fn over_quantity_is_rejected() {
        let specs = vec![AddItemSpec::new(product("p1", "shirt", true), 101)];
        let violation = rules().validate_add(&[], &specs).await.unwrap_err();
        assert!(violation.message.contains("exceeds maximum limit"));
    }

    #[tokio::test]
    async fn out_of_stock_suggests_similar() {
        let catalog = Arc::new(InMemoryProductCatalog::new(vec![
            product("p2", "other shirt", true),
            product("p3", "third shirt", true),
        ]));
        let rules = CartRules::with_catalog(CartConfig::default(), catalog);
        let specs = vec![AddItemSpec::new(product("p1", "shirt", false), 1)];

        let violation = rules.validate_add(&[], &specs).await.unwrap_err();
        assert!(violation.message.contains("out of stock"));
        assert!(violation.suggestions[0].contains("other shirt"));
    }

    #[tokio::test]
    async fn unavailable_size_lists_alternatives() {
        let specs = vec![
            AddItemSpec::new(product("p1", "shirt", true), 1)
                .with_variant(Some("XXL".to_string()), None),
        ];
        let violation = rules().validate_add(&[], &specs).await.unwrap_err();
        assert!(violation.message.contains("Size 'XXL'"));
        assert_eq!(violation.suggestions, vec!["Available sizes: S, M".to_string()]);
    }

    #[test]
    fn remove_from_empty_cart_fails() {
        let violation = rules()
            .validate_remove(&[], &RemoveCriteria::default())
            .unwrap_err();
        assert!(violation.message.contains("empty"));
    }

    #[test]
    fn remove_without_match_lists_cart_contents() {
        let current = vec![CartItem::new(product("p1", "shirt", true), 1, None, None)];
        let criteria = RemoveCriteria {
            product_name: Some("jeans".to_string()),
            ..Default::default()
        };
        let violation = rules().validate_remove(&current, &criteria).unwrap_err();
        assert!(violation.suggestions[0].contains("shirt"));
    }

    #[tokio::test]
    async fn budget_violation_names_most_expensive_line() {
        let current = vec![
            CartItem::new(product("p1", "shirt", true), 2, None, None),
            CartItem::new(
                Product {
                    price: 90.0,
                    ..product("p2", "coat", true)
                },
                1,
                None,
                None,
            ),
        ];
        let constraints = PriceConstraints {
            budget: Some(100.0),
            ..Default::default()
        };
        let violation = rules()
            .validate_price_constraints(&current, &constraints)
            .await
            .unwrap_err();
        assert!(violation.message.contains("exceeds budget"));
        assert!(violation.suggestions.iter().any(|s| s.contains("coat")));
    }

    #[tokio::test]
    async fn within_budget_passes() {
        let current = vec![CartItem::new(product("p1", "shirt", true), 1, None, None)];
        let constraints = PriceConstraints {
            budget: Some(100.0),
            max_item_price: Some(50.0),
            min_item_price: None,
        };
        assert!(rules()
            .validate_price_constraints(&current, &constraints)
            .await
            .is_ok());
    }
}
