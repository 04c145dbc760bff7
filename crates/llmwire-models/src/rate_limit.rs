use std::sync::Arc;

use async_trait::async_trait;
use llmwire_core::{ChatModel, ChatRequest, ChatResponse, Embeddings, LlmError};
use tokio::sync::Semaphore;

/// Caps the number of in-flight completions across all callers sharing it.
pub struct RateLimitedChatModel {
    inner: Arc<dyn ChatModel>,
    semaphore: Arc<Semaphore>,
}

impl RateLimitedChatModel {
    pub fn new(inner: Arc<dyn ChatModel>, max_concurrent: usize) -> Self {
        Self {
            inner,
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }
}

#[async_trait]
impl ChatModel for RateLimitedChatModel {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, LlmError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| LlmError::Config(format!("semaphore error: {e}")))?;
        self.inner.chat(request).await
    }
}

/// Caps the number of in-flight embedding calls.
pub struct RateLimitedEmbeddings {
    inner: Arc<dyn Embeddings>,
    semaphore: Arc<Semaphore>,
}

impl RateLimitedEmbeddings {
    pub fn new(inner: Arc<dyn Embeddings>, max_concurrent: usize) -> Self {
        Self {
            inner,
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }
}

#[async_trait]
impl Embeddings for RateLimitedEmbeddings {
    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn max_token_size(&self) -> usize {
        self.inner.max_token_size()
    }

    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, LlmError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| LlmError::Config(format!("semaphore error: {e}")))?;
        self.inner.embed_documents(texts).await
    }
}
