//! Shared data model: entities, intents, products, and cart projections.
//!
//! Everything here is an owned value type. `Entity` and `CommandRecord` are
//! immutable once built; resolution and cart mutation always produce new
//! values rather than editing in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kinds of entity a tagger can hand us.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Product,
    Color,
    Size,
    Material,
    Quantity,
    Price,
    Brand,
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Product => "product",
            Self::Color => "color",
            Self::Size => "size",
            Self::Material => "material",
            Self::Quantity => "quantity",
            Self::Price => "price",
            Self::Brand => "brand",
        };
        f.write_str(s)
    }
}

/// A single tagged span from the upstream entity tagger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entity {
    pub entity_type: EntityType,
    pub value: String,
    /// Tagger confidence in 0.0..=1.0.
    pub confidence: f64,
    /// Character span in the normalized command text.
    pub span: (usize, usize),
}

impl Entity {
    pub fn new(entity_type: EntityType, value: impl Into<String>, confidence: f64, span: (usize, usize)) -> Self {
        Self {
            entity_type,
            value: value.into(),
            confidence,
            span,
        }
    }
}

/// Classified user intention for one turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IntentType {
    Add,
    Remove,
    Search,
    Checkout,
    Help,
    Cancel,
}

impl std::fmt::Display for IntentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Add => "add",
            Self::Remove => "remove",
            Self::Search => "search",
            Self::Checkout => "checkout",
            Self::Help => "help",
            Self::Cancel => "cancel",
        };
        f.write_str(s)
    }
}

/// Output of the upstream intent classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intent {
    pub intent_type: IntentType,
    pub confidence: f64,
    pub entities: Vec<Entity>,
}

impl Intent {
    pub fn new(intent_type: IntentType, confidence: f64, entities: Vec<Entity>) -> Self {
        Self {
            intent_type,
            confidence,
            entities,
        }
    }
}

/// A catalog product. Owned by the external catalog; this crate copies it
/// into cart lines but never mutates it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub category: String,
    pub price: f64,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
    pub material: String,
    pub brand: String,
    pub in_stock: bool,
    #[serde(default)]
    pub description: String,
}

impl Product {
    /// Case-insensitive size availability check.
    pub fn has_size(&self, size: &str) -> bool {
        self.sizes.iter().any(|s| s.eq_ignore_ascii_case(size))
    }

    /// Case-insensitive color availability check.
    pub fn has_color(&self, color: &str) -> bool {
        self.colors.iter().any(|c| c.eq_ignore_ascii_case(color))
    }
}

/// One line of a session's cart: a product at a quantity, with the variant
/// attributes that distinguish the line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartItem {
    pub product: Product,
    pub quantity: u32,
    pub size: Option<String>,
    pub color: Option<String>,
    pub unit_price: f64,
}

impl CartItem {
    pub fn new(product: Product, quantity: u32, size: Option<String>, color: Option<String>) -> Self {
        let unit_price = product.price;
        Self {
            product,
            quantity,
            size,
            color,
            unit_price,
        }
    }

    /// Derived line total; never stored so it cannot drift from quantity.
    pub fn line_total(&self) -> f64 {
        self.unit_price * f64::from(self.quantity)
    }

    /// Whether this line is the (product, size, color) variant given.
    pub fn is_variant(&self, product_id: &str, size: Option<&str>, color: Option<&str>) -> bool {
        self.product.id == product_id
            && self.size.as_deref() == size
            && self.color.as_deref() == color
    }
}

/// A pure projection of a cart's current lines. Always recomputed via
/// [`CartSummary::from_items`]; holds no state of its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartSummary {
    pub items: Vec<CartItem>,
    pub total_items: u32,
    pub total_price: f64,
    pub timestamp: DateTime<Utc>,
}

impl CartSummary {
    pub fn from_items(items: Vec<CartItem>) -> Self {
        let total_items = items.iter().map(|i| i.quantity).sum();
        let total_price = items.iter().map(CartItem::line_total).sum();
        Self {
            items,
            total_items,
            total_price,
            timestamp: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_product(id: &str, name: &str, price: f64) -> Product {
        Product {
            id: id.to_string(),
            name: name.to_string(),
            category: "clothing".to_string(),
            price,
            sizes: vec!["S".to_string(), "M".to_string(), "L".to_string()],
            colors: vec!["red".to_string(), "blue".to_string()],
            material: "cotton".to_string(),
            brand: "Acme".to_string(),
            in_stock: true,
            description: String::new(),
        }
    }

    #[test]
    fn line_total_tracks_quantity() {
        let item = CartItem::new(test_product("p1", "shirt", 25.0), 3, None, None);
        assert_eq!(item.line_total(), 75.0);
    }

    #[test]
    fn summary_recomputes_totals() {
        let items = vec![
            CartItem::new(test_product("p1", "shirt", 25.0), 2, None, None),
            CartItem::new(test_product("p2", "jeans", 60.0), 1, None, None),
        ];
        let summary = CartSummary::from_items(items);
        assert_eq!(summary.total_items, 3);
        assert_eq!(summary.total_price, 110.0);
    }

    #[test]
    fn empty_summary() {
        let summary = CartSummary::from_items(Vec::new());
        assert!(summary.is_empty());
        assert_eq!(summary.total_items, 0);
        assert_eq!(summary.total_price, 0.0);
    }

    #[test]
    fn variant_match_is_exact_on_attributes() {
        let item = CartItem::new(
            test_product("p1", "shirt", 25.0),
            1,
            Some("M".to_string()),
            Some("red".to_string()),
        );
        assert!(item.is_variant("p1", Some("M"), Some("red")));
        assert!(!item.is_variant("p1", Some("L"), Some("red")));
        assert!(!item.is_variant("p1", Some("M"), None));
        assert!(!item.is_variant("p2", Some("M"), Some("red")));
    }

    #[test]
    fn availability_checks_are_case_insensitive() {
        let product = test_product("p1", "shirt", 25.0);
        assert!(product.has_size("m"));
        assert!(product.has_color("RED"));
        assert!(!product.has_size("XXL"));
        assert!(!product.has_color("green"));
    }

    #[test]
    fn entity_serde_round_trip() {
        let entity = Entity::new(EntityType::Product, "shirt", 0.92, (4, 9));
        let json = serde_json::to_string(&entity).unwrap();
        let parsed: Entity = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, entity);
    }
}
