//! In-memory product catalog implementation.
//!
//! Suitable for tests and embedders without a real catalog backend. Fuzzy
//! matching is a weighted blend of per-field similarity (name weighted
//! highest) with a boost for exact word hits in the product name.

use async_trait::async_trait;
use parking_lot::RwLock;

use super::traits::{ProductCatalog, SearchFilters};
use crate::config::CatalogConfig;
use crate::domain::Product;

const DEFAULT_SEARCH_LIMIT: usize = 50;

/// An in-memory catalog backed by an rwlock-protected product list.
pub struct InMemoryProductCatalog {
    products: RwLock<Vec<Product>>,
    config: CatalogConfig,
}

impl InMemoryProductCatalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self::with_config(products, CatalogConfig::default())
    }

    pub fn with_config(products: Vec<Product>, config: CatalogConfig) -> Self {
        Self {
            products: RwLock::new(products),
            config,
        }
    }

    /// Replace the whole catalog.
    pub fn replace_catalog(&self, products: Vec<Product>) {
        *self.products.write() = products;
    }

    pub fn len(&self) -> usize {
        self.products.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.read().is_empty()
    }

    fn matches_filters(product: &Product, filters: &SearchFilters) -> bool {
        if let Some(ref category) = filters.category {
            if !product.category.eq_ignore_ascii_case(category) {
                return false;
            }
        }
        if let Some(ref color) = filters.color {
            if !product.has_color(color) {
                return false;
            }
        }
        if let Some(ref size) = filters.size {
            if !product.has_size(size) {
                return false;
            }
        }
        if let Some(ref material) = filters.material {
            if !product
                .material
                .to_lowercase()
                .contains(&material.to_lowercase())
            {
                return false;
            }
        }
        if let Some(ref brand) = filters.brand {
            if !product.brand.to_lowercase().contains(&brand.to_lowercase()) {
                return false;
            }
        }
        if let Some(min) = filters.price_min {
            if product.price < min {
                return false;
            }
        }
        if let Some(max) = filters.price_max {
            if product.price > max {
                return false;
            }
        }
        if let Some(in_stock) = filters.in_stock {
            if product.in_stock != in_stock {
                return false;
            }
        }
        true
    }

    /// Weighted similarity between a query and a product across its
    /// searchable text fields.
    fn fuzzy_score(query: &str, product: &Product) -> f64 {
        let name_score = text_similarity(query, &product.name);
        let category_score = text_similarity(query, &product.category);
        let brand_score = text_similarity(query, &product.brand);
        let desc_score = if product.description.is_empty() {
            0.0
        } else {
            text_similarity(query, &product.description)
        };

        let mut score =
            name_score * 0.5 + category_score * 0.2 + brand_score * 0.2 + desc_score * 0.1;

        // Exact word hit in the name outranks pure edit-distance similarity.
        let name_lower = product.name.to_lowercase();
        if query
            .split_whitespace()
            .any(|word| name_lower.contains(word))
        {
            score += 0.2;
        }

        score
    }
}

/// A query word counts as matching a text word only above this
/// Jaro-Winkler similarity; below it, edit distance is noise ("shirt" vs
/// "shoes" must not match).
const WORD_MATCH_THRESHOLD: f64 = 0.85;

/// Share of query words with a close match in the candidate text.
fn text_similarity(query: &str, text: &str) -> f64 {
    let query = query.to_lowercase();
    let text = text.to_lowercase();
    if query == text {
        return 1.0;
    }

    let query_words: Vec<&str> = query.split_whitespace().collect();
    if query_words.is_empty() {
        return 0.0;
    }
    let text_words: Vec<&str> = text.split_whitespace().collect();

    let hits = query_words
        .iter()
        .filter(|qw| {
            text_words
                .iter()
                .any(|tw| strsim::jaro_winkler(qw, tw) >= WORD_MATCH_THRESHOLD)
        })
        .count();
    hits as f64 / query_words.len() as f64
}

#[async_trait]
impl ProductCatalog for InMemoryProductCatalog {
    async fn search(&self, filters: &SearchFilters) -> Vec<Product> {
        let products = self.products.read();
        let mut candidates: Vec<Product> = products
            .iter()
            .filter(|p| Self::matches_filters(p, filters))
            .cloned()
            .collect();
        drop(products);

        if let Some(ref query) = filters.name {
            let query = query.to_lowercase();
            let floor = self.config.fuzzy_score_floor;
            let mut scored: Vec<(Product, f64)> = candidates
                .into_iter()
                .filter_map(|p| {
                    let score = Self::fuzzy_score(&query, &p);
                    (score > floor).then_some((p, score))
                })
                .collect();
            scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
            candidates = scored.into_iter().map(|(p, _)| p).collect();
        }

        let limit = filters.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
        candidates.truncate(limit);
        candidates
    }

    async fn fuzzy_search_by_name(&self, query: &str, limit: usize) -> Vec<Product> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }

        let products = self.products.read();
        let mut scored: Vec<(Product, f64)> = products
            .iter()
            .filter_map(|p| {
                let score = Self::fuzzy_score(&query, p);
                (score > self.config.fuzzy_score_floor).then(|| (p.clone(), score))
            })
            .collect();
        drop(products);

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        scored.into_iter().map(|(p, _)| p).collect()
    }

    async fn get_by_id(&self, product_id: &str) -> Option<Product> {
        self.products
            .read()
            .iter()
            .find(|p| p.id == product_id)
            .cloned()
    }

    fn name(&self) -> &str {
        "in_memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str, name: &str, category: &str, price: f64, colors: &[&str]) -> Product {
        Product {
            id: id.to_string(),
            name: name.to_string(),
            category: category.to_string(),
            price,
            sizes: vec!["S".to_string(), "M".to_string()],
            colors: colors.iter().map(|c| (*c).to_string()).collect(),
            material: "cotton".to_string(),
            brand: "Acme".to_string(),
            in_stock: true,
            description: String::new(),
        }
    }

    fn sample_catalog() -> InMemoryProductCatalog {
        InMemoryProductCatalog::new(vec![
            product("p1", "red shirt", "clothing", 25.0, &["red"]),
            product("p2", "blue shirt", "clothing", 30.0, &["blue"]),
            product("p3", "running shoes", "footwear", 80.0, &["white"]),
        ])
    }

    #[tokio::test]
    async fn search_by_category() {
        let catalog = sample_catalog();
        let results = catalog
            .search(&SearchFilters {
                category: Some("clothing".to_string()),
                ..Default::default()
            })
            .await;
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn search_by_color_and_price() {
        let catalog = sample_catalog();
        let results = catalog
            .search(&SearchFilters {
                color: Some("red".to_string()),
                price_max: Some(26.0),
                ..Default::default()
            })
            .await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "p1");
    }

    #[tokio::test]
    async fn unconstrained_search_returns_all() {
        let catalog = sample_catalog();
        let results = catalog.search(&SearchFilters::default()).await;
        assert_eq!(results.len(), 3);
    }

    #[tokio::test]
    async fn name_filter_ranks_closest_first() {
        let catalog = sample_catalog();
        let results = catalog
            .search(&SearchFilters {
                name: Some("shirt".to_string()),
                ..Default::default()
            })
            .await;
        assert!(!results.is_empty());
        assert!(results.iter().all(|p| p.name.contains("shirt")));
    }

    #[tokio::test]
    async fn fuzzy_search_tolerates_typos() {
        let catalog = sample_catalog();
        let results = catalog.fuzzy_search_by_name("shirrt", 5).await;
        assert!(!results.is_empty());
        assert!(results[0].name.contains("shirt"));
    }

    #[tokio::test]
    async fn fuzzy_search_empty_query_is_empty() {
        let catalog = sample_catalog();
        assert!(catalog.fuzzy_search_by_name("   ", 5).await.is_empty());
    }

    #[tokio::test]
    async fn get_by_id_round_trip() {
        let catalog = sample_catalog();
        assert_eq!(catalog.get_by_id("p3").await.unwrap().name, "running shoes");
        assert!(catalog.get_by_id("missing").await.is_none());
    }

    #[test]
    fn unconstrained_detects_any_field() {
        assert!(SearchFilters::default().is_unconstrained());
        let filters = SearchFilters {
            brand: Some("Acme".to_string()),
            ..Default::default()
        };
        assert!(!filters.is_unconstrained());
    }
}
