//! Concurrency-safe, business-rule-validated cart transactions.

pub mod manager;
pub mod rules;
pub mod types;

pub use manager::CartTransactionManager;
pub use rules::{CartRules, Violation};
pub use types::{AddItemSpec, CartOutcome, PriceConstraints, RemoveCriteria};
