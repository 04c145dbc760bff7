//! Provider settings, the client registry and the three named presets.
//!
//! ```rust,ignore
//! use llmwire_presets::{openai_profile, ClientRegistry};
//!
//! let registry = ClientRegistry::from_env();
//! let profile = openai_profile(&registry)?;
//! let text = profile.best.complete("Hello", Default::default(), None).await?;
//! ```

mod profile;
mod registry;
mod settings;

pub use profile::{azure_openai_profile, ollama_profile, openai_profile, Profile};
pub use registry::{ClientRegistry, Provider};
pub use settings::{AzureSettings, OllamaSettings, OpenAiSettings, ProviderSettings};
