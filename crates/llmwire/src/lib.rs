//! llmwire: cache-augmented completion and embedding clients for OpenAI,
//! Azure OpenAI and Ollama.
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `default` | `cache` |
//! | `model-utils` | `ProviderBackend`, `RetryPolicy`, `ScriptedChatModel`, rate limiting |
//! | `cache` | Cache keys, KV stores, `complete_if_cache` |
//! | `openai` | OpenAI and Azure OpenAI chat + embeddings |
//! | `ollama` | Ollama chat + embeddings |
//! | `presets` | Provider settings, `ClientRegistry`, named profiles |
//! | `full` | All features enabled |
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use llmwire::cache::{CompletionInput, JsonKvStorage};
//! use llmwire::presets::{openai_profile, ClientRegistry};
//!
//! let registry = ClientRegistry::from_env();
//! let profile = openai_profile(&registry)?;
//! let store = JsonKvStorage::open("./cache", "llm_response_cache").await?;
//! let text = profile.cheap.complete("Hello", CompletionInput::new(), Some(&store)).await?;
//! ```

/// Core types and traits: Message, ChatModel, Embeddings, KvStorage, LlmError.
/// Always available.
pub use llmwire_core as core;

/// ProviderBackend, RetryPolicy and ChatModel/Embeddings wrappers.
#[cfg(feature = "model-utils")]
pub use llmwire_models as models;

/// OpenAI and Azure OpenAI clients.
#[cfg(feature = "openai")]
pub use llmwire_openai as openai;

/// Ollama clients.
#[cfg(feature = "ollama")]
pub use llmwire_ollama as ollama;

/// Cache-augmented completion and KV stores.
#[cfg(feature = "cache")]
pub use llmwire_cache as cache;

/// Provider settings, client registry and named profiles.
#[cfg(feature = "presets")]
pub use llmwire_presets as presets;
