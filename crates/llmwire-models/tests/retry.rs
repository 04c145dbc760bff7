use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use llmwire_core::{ChatModel, ChatRequest, ChatResponse, Embeddings, LlmError, Message};
use llmwire_models::{RetryChatModel, RetryEmbeddings, RetryPolicy};
use tokio::sync::Mutex;

fn fast_policy(max_attempts: usize) -> RetryPolicy {
    RetryPolicy::new(max_attempts).with_backoff(
        Duration::from_millis(1),
        Duration::from_millis(1),
        Duration::from_millis(2),
    )
}

fn make_error(kind: &str) -> LlmError {
    match kind {
        "rate_limit" => LlmError::RateLimit("rate limited".to_string()),
        "connection" => LlmError::Connection("connection refused".to_string()),
        _ => LlmError::Api {
            provider: "OpenAI".to_string(),
            status: 400,
            message: "non-retryable".to_string(),
        },
    }
}

struct FailThenSucceedModel {
    attempts: Arc<Mutex<usize>>,
    fail_count: usize,
    error_kind: &'static str,
}

impl FailThenSucceedModel {
    fn new(fail_count: usize, error_kind: &'static str) -> Self {
        Self {
            attempts: Arc::new(Mutex::new(0)),
            fail_count,
            error_kind,
        }
    }
}

#[async_trait]
impl ChatModel for FailThenSucceedModel {
    async fn chat(&self, _request: ChatRequest) -> Result<ChatResponse, LlmError> {
        let mut attempts = self.attempts.lock().await;
        *attempts += 1;
        if *attempts <= self.fail_count {
            Err(make_error(self.error_kind))
        } else {
            Ok(ChatResponse::text("success"))
        }
    }
}

fn request() -> ChatRequest {
    ChatRequest::new("gpt-4o-mini", vec![Message::user("hi")])
}

#[tokio::test]
async fn retries_on_rate_limit() {
    let inner = Arc::new(FailThenSucceedModel::new(2, "rate_limit"));
    let model = RetryChatModel::new(inner.clone(), fast_policy(3));
    let response = model.chat(request()).await.unwrap();
    assert_eq!(response.content, "success");
    assert_eq!(*inner.attempts.lock().await, 3);
}

#[tokio::test]
async fn retries_on_connection_failure() {
    let inner = Arc::new(FailThenSucceedModel::new(1, "connection"));
    let model = RetryChatModel::new(inner.clone(), fast_policy(5));
    let response = model.chat(request()).await.unwrap();
    assert_eq!(response.content, "success");
    assert_eq!(*inner.attempts.lock().await, 2);
}

#[tokio::test]
async fn does_not_retry_fatal_error() {
    let inner = Arc::new(FailThenSucceedModel::new(1, "api"));
    let model = RetryChatModel::new(inner.clone(), fast_policy(5));
    let err = model.chat(request()).await.unwrap_err();
    assert!(err.to_string().contains("non-retryable"));
    assert_eq!(*inner.attempts.lock().await, 1);
}

#[tokio::test]
async fn exhausts_after_configured_ceiling() {
    for ceiling in [3usize, 5] {
        let inner = Arc::new(FailThenSucceedModel::new(usize::MAX, "rate_limit"));
        let model = RetryChatModel::new(inner.clone(), fast_policy(ceiling));
        let err = model.chat(request()).await.unwrap_err();
        assert!(matches!(err, LlmError::RateLimit(_)));
        assert_eq!(*inner.attempts.lock().await, ceiling);
    }
}

#[tokio::test]
async fn zero_attempt_ceiling_still_calls_once() {
    let inner = Arc::new(FailThenSucceedModel::new(0, "rate_limit"));
    let model = RetryChatModel::new(inner.clone(), fast_policy(0));
    model.chat(request()).await.unwrap();
    assert_eq!(*inner.attempts.lock().await, 1);
}

#[tokio::test]
async fn run_returns_last_error_on_exhaustion() {
    let calls = Arc::new(Mutex::new(0usize));
    let policy = fast_policy(3);
    let result: Result<(), LlmError> = policy
        .run(|| {
            let calls = calls.clone();
            async move {
                let attempt = {
                    let mut n = calls.lock().await;
                    *n += 1;
                    *n
                };
                Err(LlmError::Connection(format!("attempt {attempt}")))
            }
        })
        .await;
    assert_eq!(result.unwrap_err().to_string(), "connection error: attempt 3");
    assert_eq!(*calls.lock().await, 3);
}

#[tokio::test(start_paused = true)]
async fn default_backoff_waits_between_attempts() {
    let inner = Arc::new(FailThenSucceedModel::new(2, "rate_limit"));
    let model = RetryChatModel::new(inner.clone(), RetryPolicy::new(5));
    let started = tokio::time::Instant::now();
    model.chat(request()).await.unwrap();
    // Two retries at the 4s floor.
    assert!(started.elapsed() >= Duration::from_secs(8));
    assert_eq!(*inner.attempts.lock().await, 3);
}

struct FlakyEmbeddings {
    attempts: Arc<Mutex<usize>>,
    error_kind: &'static str,
}

#[async_trait]
impl Embeddings for FlakyEmbeddings {
    fn dimensions(&self) -> usize {
        3
    }

    fn max_token_size(&self) -> usize {
        8192
    }

    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, LlmError> {
        let mut attempts = self.attempts.lock().await;
        *attempts += 1;
        if *attempts == 1 {
            return Err(make_error(self.error_kind));
        }
        Ok(texts.iter().map(|_| vec![0.0; 3]).collect())
    }
}

#[tokio::test]
async fn embeddings_retry_transient_errors_and_keep_metadata() {
    let inner = Arc::new(FlakyEmbeddings {
        attempts: Arc::new(Mutex::new(0)),
        error_kind: "connection",
    });
    let embeddings = RetryEmbeddings::new(inner.clone(), fast_policy(5));
    assert_eq!(embeddings.dimensions(), 3);
    assert_eq!(embeddings.max_token_size(), 8192);

    let rows = embeddings.embed_documents(&["a", "b"]).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(*inner.attempts.lock().await, 2);
}

#[tokio::test]
async fn embeddings_do_not_retry_fatal_errors() {
    let inner = Arc::new(FlakyEmbeddings {
        attempts: Arc::new(Mutex::new(0)),
        error_kind: "api",
    });
    let embeddings = RetryEmbeddings::new(inner.clone(), fast_policy(5));
    assert!(embeddings.embed_documents(&["a"]).await.is_err());
    assert_eq!(*inner.attempts.lock().await, 1);
}
