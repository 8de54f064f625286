#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::cast_precision_loss,
    clippy::doc_markdown,
    clippy::float_cmp,
    clippy::implicit_clone,
    clippy::items_after_statements,
    clippy::map_unwrap_or,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::needless_pass_by_value,
    clippy::return_self_not_must_use,
    clippy::similar_names,
    clippy::single_match_else,
    clippy::too_many_lines,
    clippy::uninlined_format_args,
    clippy::unnecessary_map_or,
    clippy::unused_self
)]

//! Conversational-commerce session engine.
//!
//! Turns a classified intent plus raw, possibly ambiguous entities into a
//! validated, session-durable cart mutation. Upstream collaborators (ASR,
//! intent classification, entity tagging) and the product catalog live
//! outside this crate; the catalog is injected via the
//! [`ProductCatalog`](catalog::ProductCatalog) capability.

pub mod ambiguity;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod context;
pub mod domain;
pub mod engine;
pub mod error;
pub mod resolver;

pub use config::Config;
pub use engine::SessionEngine;
pub use error::EngineError;
