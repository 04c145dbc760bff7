use llmwire_ollama::DEFAULT_OLLAMA_HOST;

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_AZURE_API_VERSION: &str = "2024-10-21";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenAiSettings {
    pub api_key: String,
    pub base_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AzureSettings {
    pub api_key: String,
    pub endpoint: String,
    pub api_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OllamaSettings {
    pub host: String,
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_OLLAMA_HOST.to_string(),
        }
    }
}

/// Connection settings for every provider. A provider whose credentials are
/// missing is left as `None`; the local runner is always present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderSettings {
    pub openai: Option<OpenAiSettings>,
    pub azure: Option<AzureSettings>,
    pub ollama: OllamaSettings,
}

impl ProviderSettings {
    /// Read settings from the process environment.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `OPENAI_API_KEY` | OpenAI disabled |
    /// | `OPENAI_BASE_URL` | `https://api.openai.com/v1` |
    /// | `AZURE_OPENAI_API_KEY` | Azure disabled |
    /// | `AZURE_OPENAI_ENDPOINT` | Azure disabled |
    /// | `OPENAI_API_VERSION` | `2024-10-21` |
    /// | `OLLAMA_HOST` | `http://localhost:11434` |
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build settings from an arbitrary variable lookup. Empty values count as
    /// unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

        let openai = get("OPENAI_API_KEY").map(|api_key| OpenAiSettings {
            api_key,
            base_url: get("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
        });

        let azure = match (get("AZURE_OPENAI_API_KEY"), get("AZURE_OPENAI_ENDPOINT")) {
            (Some(api_key), Some(endpoint)) => Some(AzureSettings {
                api_key,
                endpoint,
                api_version: get("OPENAI_API_VERSION")
                    .unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_string()),
            }),
            _ => None,
        };

        let ollama = get("OLLAMA_HOST")
            .map(|host| OllamaSettings { host })
            .unwrap_or_default();

        Self {
            openai,
            azure,
            ollama,
        }
    }

    pub fn with_openai(mut self, api_key: impl Into<String>) -> Self {
        self.openai = Some(OpenAiSettings {
            api_key: api_key.into(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
        });
        self
    }

    pub fn with_azure(mut self, api_key: impl Into<String>, endpoint: impl Into<String>) -> Self {
        self.azure = Some(AzureSettings {
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            api_version: DEFAULT_AZURE_API_VERSION.to_string(),
        });
        self
    }

    pub fn with_ollama_host(mut self, host: impl Into<String>) -> Self {
        self.ollama = OllamaSettings { host: host.into() };
        self
    }
}
