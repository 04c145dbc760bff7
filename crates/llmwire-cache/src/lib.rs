mod completion;
mod in_memory;
mod json;
mod key;

pub use completion::{build_messages, complete_if_cache, CompletionInput, CompletionModel};
pub use in_memory::InMemoryKvStorage;
pub use json::JsonKvStorage;
pub use key::cache_key;

// Re-export the collaborator types from core so callers need only this crate.
pub use llmwire_core::{CacheEntry, KvStorage};
