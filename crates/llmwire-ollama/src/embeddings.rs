use std::sync::Arc;

use async_trait::async_trait;
use llmwire_core::{validate_embeddings, Embeddings, LlmError};
use llmwire_models::{ProviderBackend, ProviderRequest};
use serde_json::json;

use crate::chat_model::DEFAULT_OLLAMA_HOST;

#[derive(Debug, Clone)]
pub struct OllamaEmbeddingsConfig {
    pub model: String,
    pub base_url: String,
    pub dimensions: usize,
    pub max_token_size: usize,
}

impl OllamaEmbeddingsConfig {
    /// Defaults match `nomic-embed-text`.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            base_url: DEFAULT_OLLAMA_HOST.to_string(),
            dimensions: 768,
            max_token_size: 8192,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    pub fn with_max_token_size(mut self, max_token_size: usize) -> Self {
        self.max_token_size = max_token_size;
        self
    }
}

pub struct OllamaEmbeddings {
    config: OllamaEmbeddingsConfig,
    backend: Arc<dyn ProviderBackend>,
}

impl OllamaEmbeddings {
    pub fn new(config: OllamaEmbeddingsConfig, backend: Arc<dyn ProviderBackend>) -> Self {
        Self { config, backend }
    }

    pub fn build_request(&self, texts: &[&str]) -> ProviderRequest {
        ProviderRequest {
            url: format!("{}/api/embed", self.config.base_url.trim_end_matches('/')),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: json!({
                "model": self.config.model,
                "input": texts,
            }),
        }
    }
}

#[async_trait]
impl Embeddings for OllamaEmbeddings {
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

        let response = self.backend.send(self.build_request(texts)).await?;
        response.error_for_status("Ollama")?;

        let embeddings = response
            .body
            .get("embeddings")
            .and_then(|e| e.as_array())
            .ok_or_else(|| LlmError::Embedding("missing 'embeddings' field".to_string()))?;

        let rows: Vec<Vec<f32>> = embeddings
            .iter()
            .map(|row| {
                row.as_array()
                    .map(|values| {
                        values
                            .iter()
                            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
                            .collect()
                    })
                    .ok_or_else(|| LlmError::Embedding("embedding is not an array".to_string()))
            })
            .collect::<Result<_, _>>()?;

        validate_embeddings(&rows, texts.len(), self.config.dimensions)?;
        Ok(rows)
    }
}
