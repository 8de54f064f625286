use criterion::{criterion_group, criterion_main, Criterion};

use cartflow::config::ResolverConfig;
use cartflow::context::ConversationContext;
use cartflow::domain::{CartItem, CartSummary, Entity, EntityType, Product};
use cartflow::resolver::{ReferencePatterns, ReferenceResolver};

fn product(id: &str, name: &str, price: f64) -> Product {
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

fn full_context() -> ConversationContext {
    let mut context = ConversationContext::new("bench");
    let items = (0..5)
        .map(|i| {
            CartItem::new(
                product(&format!("p{i}"), &format!("product {i}"), 10.0 + i as f64),
                1,
                Some("M".to_string()),
                Some("red".to_string()),
            )
        })
        .collect();
    context.cart_state = Some(CartSummary::from_items(items));
    context
}

fn bench_detection(c: &mut Criterion) {
    let patterns = ReferencePatterns::new();
    let entities = vec![
        Entity::new(EntityType::Product, "the first one", 0.9, (0, 13)),
        Entity::new(EntityType::Product, "that blue one", 0.9, (14, 27)),
        Entity::new(EntityType::Quantity, "2", 0.95, (28, 29)),
        Entity::new(EntityType::Product, "plain jacket", 0.9, (30, 42)),
    ];

    c.bench_function("reference_detection", |b| {
        b.iter(|| patterns.detect(std::hint::black_box(&entities)));
    });
}

fn bench_resolution(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let resolver = ReferenceResolver::new(ResolverConfig::default());
    let context = full_context();
    let entities = vec![
        Entity::new(EntityType::Product, "the first one", 0.9, (0, 13)),
        Entity::new(EntityType::Quantity, "2", 0.95, (14, 15)),
    ];

    c.bench_function("resolve_against_full_cart", |b| {
        b.iter(|| {
            runtime.block_on(resolver.resolve(
                std::hint::black_box(&entities),
                std::hint::black_box(&context),
            ))
        });
    });
}

criterion_group!(benches, bench_detection, bench_resolution);
criterion_main!(benches);
