use std::collections::HashMap;
use std::sync::Arc;

use llmwire_core::{
    CacheEntry, ChatModel, ChatRequest, CompletionOptions, KvStorage, LlmError, Message,
};

use crate::key::cache_key;

/// Everything about a completion call besides the model and the new prompt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionInput {
    pub system_prompt: Option<String>,
    pub history: Vec<Message>,
    pub options: CompletionOptions,
}

impl CompletionInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }

    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }
}

/// Assemble the conversation sent to the provider: the system prompt (when
/// non-empty), then the history in order, then `prompt` as the last user turn.
pub fn build_messages(
    prompt: &str,
    system_prompt: Option<&str>,
    history: &[Message],
) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    if let Some(system) = system_prompt.filter(|s| !s.is_empty()) {
        messages.push(Message::system(system));
    }
    messages.extend_from_slice(history);
    messages.push(Message::user(prompt));
    messages
}

/// Complete `prompt` with `model`, consulting `cache` first.
///
/// On a cache hit the stored text is returned and `client` is not called. On
/// a miss a non-empty response is upserted under the request's key and the
/// store is finalized. A failed finalize is logged and the response is still
/// returned; the entry stays in the store for the next finalize to persist.
pub async fn complete_if_cache(
    client: &dyn ChatModel,
    model: &str,
    prompt: &str,
    input: CompletionInput,
    cache: Option<&dyn KvStorage>,
) -> Result<String, LlmError> {
    let messages = build_messages(prompt, input.system_prompt.as_deref(), &input.history);

    let key = match cache {
        Some(store) => {
            let key = cache_key(model, &messages);
            if let Some(entry) = store.get_by_id(&key).await? {
                tracing::debug!(%key, model, "completion cache hit");
                return Ok(entry.response);
            }
            tracing::debug!(%key, model, "completion cache miss");
            Some(key)
        }
        None => None,
    };

    let request = ChatRequest::new(model, messages).with_options(input.options);
    let response = client.chat(request).await?;

    if response.content.is_empty() {
        // Filtered or tool-only replies are not memoized.
        tracing::debug!(model, "empty completion not cached");
        return Ok(response.content);
    }

    if let (Some(store), Some(key)) = (cache, key) {
        let entry = CacheEntry::new(response.content.clone(), model);
        store.upsert(HashMap::from([(key.clone(), entry)])).await?;
        if let Err(e) = store.index_done_callback().await {
            tracing::warn!(%key, model, error = %e, "failed to finalize completion cache");
        }
    }

    Ok(response.content)
}

/// A provider client bound to one model: the unit presets hand out as their
/// "best" and "cheap" completion functions.
#[derive(Clone)]
pub struct CompletionModel {
    client: Arc<dyn ChatModel>,
    model: String,
}

impl CompletionModel {
    pub fn new(client: Arc<dyn ChatModel>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn client(&self) -> &Arc<dyn ChatModel> {
        &self.client
    }

    pub async fn complete(
        &self,
        prompt: &str,
        input: CompletionInput,
        cache: Option<&dyn KvStorage>,
    ) -> Result<String, LlmError> {
        complete_if_cache(self.client.as_ref(), &self.model, prompt, input, cache).await
    }
}

impl std::fmt::Debug for CompletionModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionModel")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}
