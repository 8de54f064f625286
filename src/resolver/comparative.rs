//! Cross-command recall and comparative resolution.
//!
//! "Same as before" pulls the product-describing entities from the most
//! recent successful add. Comparatives ("the cheaper one") resolve against
//! a comparison base — the last cart line, or the last successful search —
//! preferring a live catalog lookup and falling back to a descriptive
//! textual entity when no catalog match exists.

use crate::catalog::{ProductCatalog, SearchFilters};
use crate::config::VocabularyConfig;
use crate::context::ConversationContext;
use crate::domain::{Entity, EntityType, IntentType, Product};

/// Fixed phrases that recall a previous command wholesale.
pub fn is_cross_command_reference(entity: &Entity, vocabulary: &VocabularyConfig) -> bool {
    let value = entity.value.to_lowercase();
    vocabulary
        .cross_command_phrases
        .iter()
        .any(|phrase| value.contains(phrase.as_str()))
}

/// Resolve a cross-command phrase from the most recent successful ADD turn.
/// Returns the product-describing entities of that turn, re-spanned to the
/// referring entity, each at 0.9x its recorded confidence.
pub fn resolve_cross_command(
    entity: &Entity,
    context: &ConversationContext,
) -> Option<Vec<Entity>> {
    let add_commands = context.commands_by_intent(IntentType::Add, 3);
    let last_successful = add_commands.iter().find(|c| c.success)?;

    let resolved: Vec<Entity> = last_successful
        .entities
        .iter()
        .filter(|e| {
            matches!(
                e.entity_type,
                EntityType::Product
                    | EntityType::Color
                    | EntityType::Size
                    | EntityType::Material
                    | EntityType::Brand
            )
        })
        .map(|e| Entity::new(e.entity_type, e.value.clone(), e.confidence * 0.9, entity.span))
        .collect();

    (!resolved.is_empty()).then_some(resolved)
}

/// Whole-word containment; "leather" must not trigger on "other".
fn has_word(text: &str, word: &str) -> bool {
    text.split_whitespace().any(|w| w.eq_ignore_ascii_case(word))
}

/// Words that mark an entity as a comparative reference.
pub fn is_comparative_reference(entity: &Entity, vocabulary: &VocabularyConfig) -> bool {
    vocabulary
        .comparative_words
        .iter()
        .any(|word| has_word(&entity.value, word))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PriceDirection {
    Lower,
    Higher,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SizeDirection {
    Larger,
    Smaller,
}

#[derive(Debug, Clone, Default)]
struct ComparisonCriteria {
    price: Option<PriceDirection>,
    size: Option<SizeDirection>,
    alternative: bool,
}

impl ComparisonCriteria {
    fn is_empty(&self) -> bool {
        self.price.is_none() && self.size.is_none() && !self.alternative
    }
}

fn extract_criteria(text: &str) -> ComparisonCriteria {
    let text = text.to_lowercase();
    let mut criteria = ComparisonCriteria::default();

    if has_word(&text, "cheaper") || text.contains("less expensive") {
        criteria.price = Some(PriceDirection::Lower);
    } else if has_word(&text, "expensive") || has_word(&text, "pricier") {
        criteria.price = Some(PriceDirection::Higher);
    }

    if has_word(&text, "larger") || has_word(&text, "bigger") {
        criteria.size = Some(SizeDirection::Larger);
    } else if has_word(&text, "smaller") {
        criteria.size = Some(SizeDirection::Smaller);
    }

    if has_word(&text, "different")
        || has_word(&text, "alternative")
        || has_word(&text, "other")
        || has_word(&text, "another")
    {
        criteria.alternative = true;
    }

    criteria
}

/// What a comparative is compared against.
#[derive(Debug, Clone)]
enum ComparisonBase {
    /// A full product from the last cart line.
    CartLine(Product),
    /// A bare product name from the last successful search.
    SearchName(String),
}

impl ComparisonBase {
    fn name(&self) -> &str {
        match self {
            Self::CartLine(product) => &product.name,
            Self::SearchName(name) => name,
        }
    }
}

fn comparison_base(context: &ConversationContext) -> Option<ComparisonBase> {
    if let Some(cart) = &context.cart_state {
        if let Some(last) = cart.items.last() {
            return Some(ComparisonBase::CartLine(last.product.clone()));
        }
    }

    for command in context.recent_commands(3).iter().rev() {
        if command.intent.intent_type == IntentType::Search && command.success {
            if let Some(product) = command
                .entities
                .iter()
                .find(|e| e.entity_type == EntityType::Product)
            {
                return Some(ComparisonBase::SearchName(product.value.clone()));
            }
        }
    }

    None
}

/// Resolve a comparative reference. With a catalog and a priced base this
/// is a live lookup; otherwise a descriptive textual entity.
pub async fn resolve_comparative(
    entity: &Entity,
    context: &ConversationContext,
    catalog: Option<&dyn ProductCatalog>,
) -> Option<Entity> {
    let base = comparison_base(context)?;
    let criteria = extract_criteria(&entity.value);
    if criteria.is_empty() {
        return None;
    }

    if let Some(catalog) = catalog {
        if let Some(found) = lookup(catalog, &base, &criteria).await {
            tracing::debug!(
                base = base.name(),
                resolved = %found.name,
                "Comparative resolved via catalog"
            );
            return Some(Entity::new(
                EntityType::Product,
                found.name,
                entity.confidence * 0.8,
                entity.span,
            ));
        }
    }

    Some(Entity::new(
        EntityType::Product,
        proxy_value(&base, &criteria),
        entity.confidence * 0.8,
        entity.span,
    ))
}

/// Live catalog lookup for the comparison target.
async fn lookup(
    catalog: &dyn ProductCatalog,
    base: &ComparisonBase,
    criteria: &ComparisonCriteria,
) -> Option<Product> {
    let ComparisonBase::CartLine(product) = base else {
        // A bare search name carries no price or category to pivot on.
        return None;
    };

    let mut filters = SearchFilters {
        category: Some(product.category.clone()),
        in_stock: Some(true),
        ..Default::default()
    };
    match criteria.price {
        Some(PriceDirection::Lower) => filters.price_max = Some(product.price),
        Some(PriceDirection::Higher) => filters.price_min = Some(product.price),
        None if criteria.alternative => {}
        // Size comparisons pivot on variant attributes, not other products.
        None => return None,
    }

    let mut results: Vec<Product> = catalog
        .search(&filters)
        .await
        .into_iter()
        .filter(|p| p.id != product.id)
        .filter(|p| match criteria.price {
            Some(PriceDirection::Lower) => p.price < product.price,
            Some(PriceDirection::Higher) => p.price > product.price,
            None => true,
        })
        .collect();

    match criteria.price {
        Some(PriceDirection::Lower) => {
            results.sort_by(|a, b| a.price.partial_cmp(&b.price).unwrap_or(std::cmp::Ordering::Equal));
        }
        Some(PriceDirection::Higher) => {
            results.sort_by(|a, b| b.price.partial_cmp(&a.price).unwrap_or(std::cmp::Ordering::Equal));
        }
        None => {}
    }

    results.into_iter().next()
}

/// Descriptive fallback when no live match exists.
fn proxy_value(base: &ComparisonBase, criteria: &ComparisonCriteria) -> String {
    let name = base.name();
    match (criteria.price, criteria.size, criteria.alternative) {
        (Some(PriceDirection::Lower), _, _) => format!("cheaper {name}"),
        (Some(PriceDirection::Higher), _, _) => format!("more expensive {name}"),
        (None, Some(SizeDirection::Larger), _) => format!("larger size of {name}"),
        (None, Some(SizeDirection::Smaller), _) => format!("smaller size of {name}"),
        (None, None, true) => format!("alternative to {name}"),
        (None, None, false) => name.to_string(),
    }
}
