use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use llmwire_core::{ChatModel, ChatRequest, ChatResponse, Embeddings, LlmError};

type RetryPredicate = Arc<dyn Fn(&LlmError) -> bool + Send + Sync>;

/// Bounded exponential-backoff retry.
///
/// The wait before retry `n` (0-based) is `multiplier * 2^n`, clamped to
/// `[min_delay, max_delay]`. Only errors accepted by the predicate are
/// retried; the default predicate is [`LlmError::is_transient`].
#[derive(Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub multiplier: Duration,
    pub min_delay: Duration,
    pub max_delay: Duration,
    retry_if: RetryPredicate,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            multiplier: Duration::from_secs(1),
            min_delay: Duration::from_secs(4),
            max_delay: Duration::from_secs(10),
            retry_if: Arc::new(LlmError::is_transient),
        }
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("multiplier", &self.multiplier)
            .field("min_delay", &self.min_delay)
            .field("max_delay", &self.max_delay)
            .finish_non_exhaustive()
    }
}

impl RetryPolicy {
    /// Default backoff with the given attempt ceiling.
    pub fn new(max_attempts: usize) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    pub fn with_backoff(mut self, multiplier: Duration, min: Duration, max: Duration) -> Self {
        self.multiplier = multiplier;
        self.min_delay = min;
        self.max_delay = max;
        self
    }

    /// Replace the transient-error predicate.
    pub fn with_retry_if<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&LlmError) -> bool + Send + Sync + 'static,
    {
        self.retry_if = Arc::new(predicate);
        self
    }

    pub fn should_retry(&self, error: &LlmError) -> bool {
        (self.retry_if)(error)
    }

    /// Wait before the retry with 0-based index `retry`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        self.multiplier
            .saturating_mul(factor)
            .max(self.min_delay)
            .min(self.max_delay)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt ceiling is reached. The last error is returned on exhaustion.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, LlmError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0usize;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < max_attempts && self.should_retry(&e) => {
                    let delay = self.delay_for((attempt - 1) as u32);
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying provider call"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

pub struct RetryChatModel {
    inner: Arc<dyn ChatModel>,
    policy: RetryPolicy,
}

impl RetryChatModel {
    pub fn new(inner: Arc<dyn ChatModel>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl ChatModel for RetryChatModel {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, LlmError> {
        self.policy
            .run(|| self.inner.chat(request.clone()))
            .await
    }
}

pub struct RetryEmbeddings {
    inner: Arc<dyn Embeddings>,
    policy: RetryPolicy,
}

impl RetryEmbeddings {
    pub fn new(inner: Arc<dyn Embeddings>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl Embeddings for RetryEmbeddings {
    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn max_token_size(&self) -> usize {
        self.inner.max_token_size()
    }

    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, LlmError> {
        self.policy
            .run(|| self.inner.embed_documents(texts))
            .await
    }
}
