use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use llmwire_core::{ChatModel, Embeddings, LlmError};
use llmwire_models::{HttpBackend, ProviderBackend, RetryChatModel, RetryEmbeddings, RetryPolicy};
use llmwire_ollama::{OllamaChatModel, OllamaConfig, OllamaEmbeddings, OllamaEmbeddingsConfig};
use llmwire_openai::{
    AzureOpenAiChatModel, AzureOpenAiConfig, AzureOpenAiEmbeddings, AzureOpenAiEmbeddingsConfig,
    OpenAiChatModel, OpenAiConfig, OpenAiEmbeddings, OpenAiEmbeddingsConfig,
};

use crate::settings::ProviderSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    OpenAi,
    AzureOpenAi,
    Ollama,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::OpenAi, Provider::AzureOpenAi, Provider::Ollama];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::AzureOpenAi => "azure_openai",
            Provider::Ollama => "ollama",
        }
    }

    /// Attempt ceiling for calls to this provider.
    pub fn max_attempts(&self) -> usize {
        match self {
            Provider::AzureOpenAi => 3,
            Provider::OpenAi | Provider::Ollama => 5,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts())
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One retrying chat client per configured provider, built up front and
/// shared by reference.
pub struct ClientRegistry {
    settings: ProviderSettings,
    backend: Arc<dyn ProviderBackend>,
    clients: HashMap<Provider, Arc<dyn ChatModel>>,
}

impl ClientRegistry {
    pub fn new(settings: ProviderSettings, backend: Arc<dyn ProviderBackend>) -> Self {
        let mut clients: HashMap<Provider, Arc<dyn ChatModel>> = HashMap::new();

        if let Some(openai) = &settings.openai {
            let config = OpenAiConfig::new(&openai.api_key).with_base_url(&openai.base_url);
            clients.insert(
                Provider::OpenAi,
                with_retry(
                    Provider::OpenAi,
                    Arc::new(OpenAiChatModel::new(config, backend.clone())),
                ),
            );
        }

        if let Some(azure) = &settings.azure {
            let config = AzureOpenAiConfig::new(&azure.api_key, &azure.endpoint)
                .with_api_version(&azure.api_version);
            clients.insert(
                Provider::AzureOpenAi,
                with_retry(
                    Provider::AzureOpenAi,
                    Arc::new(AzureOpenAiChatModel::new(config, backend.clone())),
                ),
            );
        }

        let config = OllamaConfig::new().with_base_url(&settings.ollama.host);
        clients.insert(
            Provider::Ollama,
            with_retry(
                Provider::Ollama,
                Arc::new(OllamaChatModel::new(config, backend.clone())),
            ),
        );

        let configured: Vec<&str> = Provider::ALL
            .iter()
            .filter(|p| clients.contains_key(*p))
            .map(Provider::as_str)
            .collect();
        tracing::info!(providers = ?configured, "client registry ready");

        Self {
            settings,
            backend,
            clients,
        }
    }

    /// Registry over the process environment and a reqwest backend.
    pub fn from_env() -> Self {
        Self::new(ProviderSettings::from_env(), Arc::new(HttpBackend::new()))
    }

    pub fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    pub fn is_configured(&self, provider: Provider) -> bool {
        self.clients.contains_key(&provider)
    }

    /// The shared chat client for `provider`. Every call returns the same
    /// instance.
    pub fn client(&self, provider: Provider) -> Result<Arc<dyn ChatModel>, LlmError> {
        self.clients
            .get(&provider)
            .cloned()
            .ok_or_else(|| not_configured(provider))
    }

    /// A retrying embedder for `model` on `provider`. For Azure the model is
    /// the deployment name.
    pub fn embeddings(
        &self,
        provider: Provider,
        model: &str,
        dimensions: usize,
    ) -> Result<Arc<dyn Embeddings>, LlmError> {
        let inner: Arc<dyn Embeddings> = match provider {
            Provider::OpenAi => {
                let openai = self
                    .settings
                    .openai
                    .as_ref()
                    .ok_or_else(|| not_configured(provider))?;
                let config = OpenAiEmbeddingsConfig::new(&openai.api_key)
                    .with_base_url(&openai.base_url)
                    .with_model(model)
                    .with_dimensions(dimensions);
                Arc::new(OpenAiEmbeddings::new(config, self.backend.clone()))
            }
            Provider::AzureOpenAi => {
                let azure = self
                    .settings
                    .azure
                    .as_ref()
                    .ok_or_else(|| not_configured(provider))?;
                let config = AzureOpenAiEmbeddingsConfig::new(&azure.api_key, &azure.endpoint)
                    .with_api_version(&azure.api_version)
                    .with_deployment_name(model)
                    .with_dimensions(dimensions);
                Arc::new(AzureOpenAiEmbeddings::new(config, self.backend.clone()))
            }
            Provider::Ollama => {
                let config = OllamaEmbeddingsConfig::new(model)
                    .with_base_url(&self.settings.ollama.host)
                    .with_dimensions(dimensions);
                Arc::new(OllamaEmbeddings::new(config, self.backend.clone()))
            }
        };
        Ok(Arc::new(RetryEmbeddings::new(inner, provider.retry_policy())))
    }
}

impl fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let configured: Vec<Provider> = Provider::ALL
            .into_iter()
            .filter(|p| self.clients.contains_key(p))
            .collect();
        f.debug_struct("ClientRegistry")
            .field("configured", &configured)
            .finish_non_exhaustive()
    }
}

fn with_retry(provider: Provider, inner: Arc<dyn ChatModel>) -> Arc<dyn ChatModel> {
    Arc::new(RetryChatModel::new(inner, provider.retry_policy()))
}

fn not_configured(provider: Provider) -> LlmError {
    LlmError::Config(format!("provider '{provider}' is not configured"))
}
