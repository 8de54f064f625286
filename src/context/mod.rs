pub mod in_memory;
pub mod traits;

pub use in_memory::InMemoryContextStore;
pub use traits::{
    CommandRecord, ContextStore, ContextStoreStats, ConversationContext, SessionStatistics,
};
