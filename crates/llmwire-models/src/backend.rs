use std::{collections::VecDeque, sync::Arc};

use async_trait::async_trait;
use llmwire_core::LlmError;
use serde_json::Value;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

impl ProviderRequest {
    /// Value of the first header named `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub status: u16,
    pub body: Value,
}

impl ProviderResponse {
    /// Map an error status to the matching `LlmError`.
    ///
    /// 429 is a rate-limit rejection and therefore transient; any other status
    /// of 400 or above is a fatal API error.
    pub fn error_for_status(&self, provider: &str) -> Result<(), LlmError> {
        if self.status == 429 {
            return Err(LlmError::RateLimit(
                self.error_message().unwrap_or("rate limited").to_string(),
            ));
        }
        if self.status >= 400 {
            return Err(LlmError::Api {
                provider: provider.to_string(),
                status: self.status,
                message: self
                    .error_message()
                    .unwrap_or("unknown API error")
                    .to_string(),
            });
        }
        Ok(())
    }

    // OpenAI nests the message under `error.message`, Ollama uses a bare
    // `error` string, and proxies sometimes answer with plain text.
    fn error_message(&self) -> Option<&str> {
        self.body["error"]["message"]
            .as_str()
            .or_else(|| self.body["error"].as_str())
            .or_else(|| self.body.as_str())
    }
}

#[async_trait]
pub trait ProviderBackend: Send + Sync {
    async fn send(&self, request: ProviderRequest) -> Result<ProviderResponse, LlmError>;
}

/// Production backend using reqwest.
pub struct HttpBackend {
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Use a preconfigured client (proxies, timeouts, TLS settings).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for HttpBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn map_send_error(e: reqwest::Error) -> LlmError {
    if e.is_builder() {
        LlmError::Config(format!("invalid HTTP request: {e}"))
    } else {
        LlmError::Connection(format!("HTTP request failed: {e}"))
    }
}

#[async_trait]
impl ProviderBackend for HttpBackend {
    async fn send(&self, request: ProviderRequest) -> Result<ProviderResponse, LlmError> {
        let mut builder = self.client.post(&request.url);
        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }
        builder = builder.json(&request.body);

        let response = builder.send().await.map_err(map_send_error)?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::Connection(format!("failed to read response body: {e}")))?;

        // Error pages from gateways are not always JSON; keep them as a string
        // so status classification still sees the text.
        let body: Value = match serde_json::from_str(&text) {
            Ok(body) => body,
            Err(_) if status >= 400 => Value::String(text),
            Err(e) => {
                return Err(LlmError::Parsing(format!(
                    "failed to parse response JSON: {e}"
                )))
            }
        };

        Ok(ProviderResponse { status, body })
    }
}

/// Test backend with queued responses. Every request it receives is recorded.
pub struct FakeBackend {
    responses: Arc<Mutex<VecDeque<Result<ProviderResponse, LlmError>>>>,
    requests: Arc<Mutex<Vec<ProviderRequest>>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn push_response(&self, response: ProviderResponse) -> &Self {
        self.responses
            .try_lock()
            .expect("not concurrent during setup")
            .push_back(Ok(response));
        self
    }

    pub fn push_error(&self, error: LlmError) -> &Self {
        self.responses
            .try_lock()
            .expect("not concurrent during setup")
            .push_back(Err(error));
        self
    }

    /// Requests received so far, oldest first.
    pub async fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderBackend for FakeBackend {
    async fn send(&self, request: ProviderRequest) -> Result<ProviderResponse, LlmError> {
        self.requests.lock().await.push(request);
        let mut responses = self.responses.lock().await;
        responses
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::Parsing("FakeBackend exhausted".to_string())))
    }
}
