use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// The author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A single conversation turn. Serialized as `{"role": ..., "content": ...}`,
/// which is also the wire shape every supported provider accepts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn is_system(&self) -> bool {
        self.role == Role::System
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }
}

// ---------------------------------------------------------------------------
// Completion options
// ---------------------------------------------------------------------------

/// Generation options forwarded to the provider.
///
/// The named fields cover what every provider understands. `extra` is a
/// passthrough bag for provider-specific fields; each adapter merges it into
/// the request body after the named fields, so an `extra` entry wins over a
/// named field with the same wire name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl CompletionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_top_p(mut self, top_p: f64) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn with_stop(mut self, stop: Vec<String>) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Add a provider-specific field that is passed through verbatim.
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

// ---------------------------------------------------------------------------
// Chat request / response
// ---------------------------------------------------------------------------

/// A completion request: which model, the ordered conversation, and options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "CompletionOptions::is_empty")]
    pub options: CompletionOptions,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            options: CompletionOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
}

/// The text of the first choice returned by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

impl ChatResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            usage: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Unified error type for llmwire.
///
/// `RateLimit` and `Connection` are transient and eligible for retry; every
/// other variant is fatal for the call that produced it.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("rate limit: {0}")]
    RateLimit(String),
    #[error("connection error: {0}")]
    Connection(String),
    #[error("{provider} API error ({status}): {message}")]
    Api {
        provider: String,
        status: u16,
        message: String,
    },
    #[error("parsing error: {0}")]
    Parsing(String),
    #[error("embedding error: {0}")]
    Embedding(String),
    #[error("cache error: {0}")]
    Cache(String),
    #[error("config error: {0}")]
    Config(String),
}

impl LlmError {
    /// Whether a retry has a reasonable chance of succeeding.
    pub fn is_transient(&self) -> bool {
        matches!(self, LlmError::RateLimit(_) | LlmError::Connection(_))
    }
}

// ---------------------------------------------------------------------------
// ChatModel trait
// ---------------------------------------------------------------------------

/// A provider's chat-completion endpoint. The model is chosen per request, so
/// one client handle serves every model the provider hosts.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, LlmError>;
}

// ---------------------------------------------------------------------------
// Embeddings trait
// ---------------------------------------------------------------------------

/// Trait for embedding text into fixed-width vectors.
///
/// `dimensions` and `max_token_size` are static metadata consumed by callers
/// that batch and truncate input; implementations do not enforce the token
/// limit themselves.
#[async_trait]
pub trait Embeddings: Send + Sync {
    /// Width of every returned vector.
    fn dimensions(&self) -> usize;

    /// Largest input, in tokens, the model accepts.
    fn max_token_size(&self) -> usize;

    /// Embed multiple texts. Returns one row per input, in input order.
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, LlmError>;

    /// Embed a single query text.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let mut rows = self.embed_documents(&[text]).await?;
        rows.pop()
            .ok_or_else(|| LlmError::Embedding("empty response".to_string()))
    }
}

// ---------------------------------------------------------------------------
// Key-value cache collaborator
// ---------------------------------------------------------------------------

/// A memoized completion, stored under its cache key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(rename = "return")]
    pub response: String,
    pub model: String,
}

impl CacheEntry {
    pub fn new(response: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            model: model.into(),
        }
    }
}

/// Key-value storage used to memoize completions.
///
/// Writes become durable only after `index_done_callback`; stores that keep
/// everything in memory may treat it as a no-op.
#[async_trait]
pub trait KvStorage: Send + Sync {
    /// Look up an entry by its key.
    async fn get_by_id(&self, id: &str) -> Result<Option<CacheEntry>, LlmError>;

    /// Insert or replace entries.
    async fn upsert(&self, entries: HashMap<String, CacheEntry>) -> Result<(), LlmError>;

    /// Finalize pending writes.
    async fn index_done_callback(&self) -> Result<(), LlmError> {
        Ok(())
    }
}

/// Check that an embedding matrix has one row per input and that every row has
/// the declared width.
pub fn validate_embeddings(
    rows: &[Vec<f32>],
    expected_rows: usize,
    dimensions: usize,
) -> Result<(), LlmError> {
    if rows.len() != expected_rows {
        return Err(LlmError::Embedding(format!(
            "expected {expected_rows} embeddings, got {}",
            rows.len()
        )));
    }
    if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != dimensions) {
        return Err(LlmError::Embedding(format!(
            "embedding {i} has {} dimensions, expected {dimensions}",
            row.len()
        )));
    }
    Ok(())
}
