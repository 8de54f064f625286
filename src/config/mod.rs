pub mod schema;

pub use schema::{
    CartConfig, CatalogConfig, Config, ContextConfig, ResolverConfig, VocabularyConfig,
};
