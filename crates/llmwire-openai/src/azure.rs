use std::sync::Arc;

use async_trait::async_trait;
use llmwire_core::{ChatModel, ChatRequest, ChatResponse, Embeddings, LlmError};
use llmwire_models::{ProviderBackend, ProviderRequest};

use crate::chat_model::{chat_body, parse_response};
use crate::embeddings::{
    embedding_body, parse_embeddings, DEFAULT_DIMENSIONS, DEFAULT_EMBEDDING_MODEL,
    DEFAULT_MAX_TOKEN_SIZE,
};

const DEFAULT_API_VERSION: &str = "2024-10-21";
const PROVIDER: &str = "Azure OpenAI";

fn resource_endpoint(resource_name: &str) -> String {
    format!("https://{resource_name}.openai.azure.com")
}

fn deployment_url(endpoint: &str, deployment: &str, operation: &str, api_version: &str) -> String {
    format!(
        "{}/openai/deployments/{deployment}/{operation}?api-version={api_version}",
        endpoint.trim_end_matches('/')
    )
}

fn auth_headers(api_key: &str) -> Vec<(String, String)> {
    vec![
        ("api-key".to_string(), api_key.to_string()),
        ("Content-Type".to_string(), "application/json".to_string()),
    ]
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

/// Connection settings for an Azure OpenAI resource.
///
/// The request's model identifier is used as the deployment name.
#[derive(Debug, Clone)]
pub struct AzureOpenAiConfig {
    pub api_key: String,
    pub endpoint: String,
    pub api_version: String,
}

impl AzureOpenAiConfig {
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }

    /// Config for `https://{resource_name}.openai.azure.com`.
    pub fn for_resource(api_key: impl Into<String>, resource_name: &str) -> Self {
        Self::new(api_key, resource_endpoint(resource_name))
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }
}

pub struct AzureOpenAiChatModel {
    config: AzureOpenAiConfig,
    backend: Arc<dyn ProviderBackend>,
}

impl AzureOpenAiChatModel {
    pub fn new(config: AzureOpenAiConfig, backend: Arc<dyn ProviderBackend>) -> Self {
        Self { config, backend }
    }

    pub fn config(&self) -> &AzureOpenAiConfig {
        &self.config
    }

    pub fn build_request(&self, request: &ChatRequest) -> ProviderRequest {
        let mut body = chat_body(request);
        // The deployment in the URL selects the model.
        if let Some(obj) = body.as_object_mut() {
            obj.remove("model");
        }

        ProviderRequest {
            url: deployment_url(
                &self.config.endpoint,
                &request.model,
                "chat/completions",
                &self.config.api_version,
            ),
            headers: auth_headers(&self.config.api_key),
            body,
        }
    }
}

#[async_trait]
impl ChatModel for AzureOpenAiChatModel {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, LlmError> {
        let provider_req = self.build_request(&request);
        let resp = self.backend.send(provider_req).await?;
        parse_response(PROVIDER, &resp)
    }
}

// ---------------------------------------------------------------------------
// Embeddings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AzureOpenAiEmbeddingsConfig {
    pub api_key: String,
    pub endpoint: String,
    pub api_version: String,
    pub deployment_name: String,
    pub dimensions: usize,
    pub max_token_size: usize,
}

impl AzureOpenAiEmbeddingsConfig {
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            deployment_name: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimensions: DEFAULT_DIMENSIONS,
            max_token_size: DEFAULT_MAX_TOKEN_SIZE,
        }
    }

    pub fn for_resource(api_key: impl Into<String>, resource_name: &str) -> Self {
        Self::new(api_key, resource_endpoint(resource_name))
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    pub fn with_deployment_name(mut self, deployment_name: impl Into<String>) -> Self {
        self.deployment_name = deployment_name.into();
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

pub struct AzureOpenAiEmbeddings {
    config: AzureOpenAiEmbeddingsConfig,
    backend: Arc<dyn ProviderBackend>,
}

impl AzureOpenAiEmbeddings {
    pub fn new(config: AzureOpenAiEmbeddingsConfig, backend: Arc<dyn ProviderBackend>) -> Self {
        Self { config, backend }
    }

    pub fn build_request(&self, texts: &[&str]) -> ProviderRequest {
        ProviderRequest {
            url: deployment_url(
                &self.config.endpoint,
                &self.config.deployment_name,
                "embeddings",
                &self.config.api_version,
            ),
            headers: auth_headers(&self.config.api_key),
            body: embedding_body(None, texts),
        }
    }
}

#[async_trait]
impl Embeddings for AzureOpenAiEmbeddings {
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
        parse_embeddings(PROVIDER, &response, texts.len(), self.config.dimensions)
    }
}
