use std::sync::Arc;

use async_trait::async_trait;
use llmwire_core::{validate_embeddings, Embeddings, LlmError};
use llmwire_models::{ProviderBackend, ProviderRequest, ProviderResponse};
use serde_json::{json, Value};

use crate::chat_model::DEFAULT_BASE_URL;

pub(crate) const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub(crate) const DEFAULT_DIMENSIONS: usize = 1536;
pub(crate) const DEFAULT_MAX_TOKEN_SIZE: usize = 8192;

#[derive(Debug, Clone)]
pub struct OpenAiEmbeddingsConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub dimensions: usize,
    pub max_token_size: usize,
}

impl OpenAiEmbeddingsConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            dimensions: DEFAULT_DIMENSIONS,
            max_token_size: DEFAULT_MAX_TOKEN_SIZE,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Declared vector width. Responses of any other width are rejected.
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    pub fn with_max_token_size(mut self, max_token_size: usize) -> Self {
        self.max_token_size = max_token_size;
        self
    }
}

pub struct OpenAiEmbeddings {
    config: OpenAiEmbeddingsConfig,
    backend: Arc<dyn ProviderBackend>,
}

impl OpenAiEmbeddings {
    pub fn new(config: OpenAiEmbeddingsConfig, backend: Arc<dyn ProviderBackend>) -> Self {
        Self { config, backend }
    }

    pub fn build_request(&self, texts: &[&str]) -> ProviderRequest {
        ProviderRequest {
            url: format!("{}/embeddings", self.config.base_url.trim_end_matches('/')),
            headers: vec![
                (
                    "Authorization".to_string(),
                    format!("Bearer {}", self.config.api_key),
                ),
                ("Content-Type".to_string(), "application/json".to_string()),
            ],
            body: embedding_body(Some(&self.config.model), texts),
        }
    }
}

pub(crate) fn embedding_body(model: Option<&str>, texts: &[&str]) -> Value {
    let mut body = json!({
        "input": texts,
        "encoding_format": "float",
    });
    if let Some(model) = model {
        body["model"] = json!(model);
    }
    body
}

/// Parse a `data` array into rows ordered by each item's `index`.
pub(crate) fn parse_embeddings(
    provider: &str,
    resp: &ProviderResponse,
    expected_rows: usize,
    dimensions: usize,
) -> Result<Vec<Vec<f32>>, LlmError> {
    resp.error_for_status(provider)?;

    let data = resp.body["data"].as_array().ok_or_else(|| {
        LlmError::Embedding("missing 'data' field in response".to_string())
    })?;

    let mut indexed = Vec::with_capacity(data.len());
    for (position, item) in data.iter().enumerate() {
        let index = item["index"].as_u64().map(|i| i as usize).unwrap_or(position);
        let embedding: Vec<f32> = item["embedding"]
            .as_array()
            .ok_or_else(|| LlmError::Embedding("missing 'embedding' field".to_string()))?
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();
        indexed.push((index, embedding));
    }
    indexed.sort_by_key(|(index, _)| *index);
    if indexed.len() == expected_rows
        && indexed.iter().enumerate().any(|(i, (index, _))| i != *index)
    {
        let indices: Vec<usize> = indexed.iter().map(|(index, _)| *index).collect();
        return Err(LlmError::Embedding(format!(
            "embedding indices {indices:?} do not cover 0..{expected_rows}"
        )));
    }

    let rows: Vec<Vec<f32>> = indexed.into_iter().map(|(_, e)| e).collect();
    validate_embeddings(&rows, expected_rows, dimensions)?;
    Ok(rows)
}

#[async_trait]
impl Embeddings for OpenAiEmbeddings {
    fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    fn max_token_size(&self) -> usize {
        self.config.max_token_size
    }

    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, LlmError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let request = self.build_request(texts);
        let response = self.backend.send(request).await?;
        parse_embeddings("OpenAI", &response, texts.len(), self.config.dimensions)
    }
}
