use std::fmt;
use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use llmwire_cache::CompletionModel;
use llmwire_core::{Embeddings, LlmError};
use llmwire_models::{RateLimitedChatModel, RateLimitedEmbeddings};

use crate::registry::{ClientRegistry, Provider};

const QUERY_BETTER_THAN_THRESHOLD: f32 = 0.2;
const COMPLETION_MAX_TOKEN_SIZE: usize = 32768;

/// A fixed bundle of embedding and completion functions plus their limits.
///
/// The limits are advisory: nothing here enforces them unless the caller asks
/// for [`Profile::rate_limited`] or uses [`Profile::embed_batched`].
#[derive(Clone)]
pub struct Profile {
    pub provider: Provider,
    pub embedding: Arc<dyn Embeddings>,
    pub embedding_batch_num: usize,
    pub embedding_func_max_async: usize,
    pub query_better_than_threshold: f32,
    pub best: CompletionModel,
    pub best_max_token_size: usize,
    pub best_max_async: usize,
    pub cheap: CompletionModel,
    pub cheap_max_token_size: usize,
    pub cheap_max_async: usize,
}

struct PresetSpec {
    provider: Provider,
    embedding_model: &'static str,
    embedding_dimensions: usize,
    embedding_batch_num: usize,
    embedding_func_max_async: usize,
    best_model: &'static str,
    cheap_model: &'static str,
    max_async: usize,
}

const OPENAI: PresetSpec = PresetSpec {
    provider: Provider::OpenAi,
    embedding_model: "text-embedding-3-small",
    embedding_dimensions: 1536,
    embedding_batch_num: 32,
    embedding_func_max_async: 16,
    best_model: "gpt-4o-mini",
    cheap_model: "gpt-4o-mini",
    max_async: 16,
};

const AZURE_OPENAI: PresetSpec = PresetSpec {
    provider: Provider::AzureOpenAi,
    embedding_model: "text-embedding-3-small",
    embedding_dimensions: 1536,
    embedding_batch_num: 32,
    embedding_func_max_async: 16,
    best_model: "gpt-4o",
    cheap_model: "gpt-4o-mini",
    max_async: 16,
};

const OLLAMA: PresetSpec = PresetSpec {
    provider: Provider::Ollama,
    embedding_model: "nomic-embed-text",
    embedding_dimensions: 768,
    embedding_batch_num: 1,
    embedding_func_max_async: 1,
    best_model: "gemma2:latest",
    cheap_model: "olmo2",
    max_async: 1,
};

impl PresetSpec {
    fn build(&self, registry: &ClientRegistry) -> Result<Profile, LlmError> {
        let client = registry.client(self.provider)?;
        let embedding = registry.embeddings(
            self.provider,
            self.embedding_model,
            self.embedding_dimensions,
        )?;
        Ok(Profile {
            provider: self.provider,
            embedding,
            embedding_batch_num: self.embedding_batch_num,
            embedding_func_max_async: self.embedding_func_max_async,
            query_better_than_threshold: QUERY_BETTER_THAN_THRESHOLD,
            best: CompletionModel::new(client.clone(), self.best_model),
            best_max_token_size: COMPLETION_MAX_TOKEN_SIZE,
            best_max_async: self.max_async,
            cheap: CompletionModel::new(client, self.cheap_model),
            cheap_max_token_size: COMPLETION_MAX_TOKEN_SIZE,
            cheap_max_async: self.max_async,
        })
    }
}

/// Commercial OpenAI preset.
pub fn openai_profile(registry: &ClientRegistry) -> Result<Profile, LlmError> {
    OPENAI.build(registry)
}

/// Azure OpenAI preset. Model names double as deployment names.
pub fn azure_openai_profile(registry: &ClientRegistry) -> Result<Profile, LlmError> {
    AZURE_OPENAI.build(registry)
}

/// Local Ollama preset.
pub fn ollama_profile(registry: &ClientRegistry) -> Result<Profile, LlmError> {
    OLLAMA.build(registry)
}

impl Profile {
    pub fn for_provider(provider: Provider, registry: &ClientRegistry) -> Result<Self, LlmError> {
        match provider {
            Provider::OpenAi => openai_profile(registry),
            Provider::AzureOpenAi => azure_openai_profile(registry),
            Provider::Ollama => ollama_profile(registry),
        }
    }

    /// Embed `texts` in chunks of `embedding_batch_num`, with at most
    /// `embedding_func_max_async` chunks in flight. Output order matches input.
    pub async fn embed_batched(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, LlmError> {
        let batch_size = self.embedding_batch_num.max(1);
        let batches: Vec<Vec<Vec<f32>>> = stream::iter(texts.chunks(batch_size))
            .map(|chunk| self.embedding.embed_documents(chunk))
            .buffered(self.embedding_func_max_async.max(1))
            .try_collect()
            .await?;
        Ok(batches.into_iter().flatten().collect())
    }

    /// Copy of this profile whose functions enforce the concurrency ceilings.
    pub fn rate_limited(&self) -> Self {
        let limit = |model: &CompletionModel, max: usize| {
            CompletionModel::new(
                Arc::new(RateLimitedChatModel::new(model.client().clone(), max)),
                model.model(),
            )
        };
        Self {
            embedding: Arc::new(RateLimitedEmbeddings::new(
                self.embedding.clone(),
                self.embedding_func_max_async,
            )),
            best: limit(&self.best, self.best_max_async),
            cheap: limit(&self.cheap, self.cheap_max_async),
            ..self.clone()
        }
    }
}

impl fmt::Debug for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Profile")
            .field("provider", &self.provider)
            .field("embedding_dimensions", &self.embedding.dimensions())
            .field("embedding_batch_num", &self.embedding_batch_num)
            .field("embedding_func_max_async", &self.embedding_func_max_async)
            .field("best", &self.best)
            .field("cheap", &self.cheap)
            .finish_non_exhaustive()
    }
}
