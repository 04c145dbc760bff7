use std::sync::Arc;

use async_trait::async_trait;
use llmwire_core::{
    ChatModel, ChatRequest, ChatResponse, CompletionOptions, LlmError, Message, TokenUsage,
};
use llmwire_models::{ProviderBackend, ProviderRequest, ProviderResponse};
use serde_json::{json, Value};

pub(crate) const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub organization: Option<String>,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            organization: None,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }
}

/// Client for the OpenAI chat-completions endpoint. One instance serves every
/// model; the model is taken from each request.
pub struct OpenAiChatModel {
    config: OpenAiConfig,
    backend: Arc<dyn ProviderBackend>,
}

impl OpenAiChatModel {
    pub fn new(config: OpenAiConfig, backend: Arc<dyn ProviderBackend>) -> Self {
        Self { config, backend }
    }

    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    pub fn build_request(&self, request: &ChatRequest) -> ProviderRequest {
        let mut headers = vec![
            (
                "Authorization".to_string(),
                format!("Bearer {}", self.config.api_key),
            ),
            ("Content-Type".to_string(), "application/json".to_string()),
        ];
        if let Some(ref org) = self.config.organization {
            headers.push(("OpenAI-Organization".to_string(), org.clone()));
        }

        ProviderRequest {
            url: format!(
                "{}/chat/completions",
                self.config.base_url.trim_end_matches('/')
            ),
            headers,
            body: chat_body(request),
        }
    }
}

pub(crate) fn chat_body(request: &ChatRequest) -> Value {
    let messages: Vec<Value> = request.messages.iter().map(message_to_openai).collect();

    let mut body = json!({
        "model": request.model,
        "messages": messages,
    });
    apply_options(&mut body, &request.options);
    body
}

fn message_to_openai(msg: &Message) -> Value {
    json!({
        "role": msg.role.as_str(),
        "content": msg.content,
    })
}

fn apply_options(body: &mut Value, options: &CompletionOptions) {
    if let Some(max_tokens) = options.max_tokens {
        body["max_tokens"] = json!(max_tokens);
    }
    if let Some(temp) = options.temperature {
        body["temperature"] = json!(temp);
    }
    if let Some(top_p) = options.top_p {
        body["top_p"] = json!(top_p);
    }
    if let Some(ref stop) = options.stop {
        body["stop"] = json!(stop);
    }
    if let Some(seed) = options.seed {
        body["seed"] = json!(seed);
    }
    for (key, value) in &options.extra {
        body[key.as_str()] = value.clone();
    }
}

pub(crate) fn parse_response(
    provider: &str,
    resp: &ProviderResponse,
) -> Result<ChatResponse, LlmError> {
    resp.error_for_status(provider)?;

    let choice = resp.body["choices"]
        .get(0)
        .ok_or_else(|| LlmError::Parsing(format!("{provider} response has no choices")))?;
    // A filtered or tool-only answer carries `content: null`.
    let content = choice["message"]["content"]
        .as_str()
        .unwrap_or("")
        .to_string();

    Ok(ChatResponse {
        content,
        usage: parse_usage(&resp.body["usage"]),
    })
}

fn parse_usage(usage: &Value) -> Option<TokenUsage> {
    if usage.is_null() {
        return None;
    }
    Some(TokenUsage {
        input_tokens: usage["prompt_tokens"].as_u64().unwrap_or(0) as u32,
        output_tokens: usage["completion_tokens"].as_u64().unwrap_or(0) as u32,
        total_tokens: usage["total_tokens"].as_u64().unwrap_or(0) as u32,
    })
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, LlmError> {
        let provider_req = self.build_request(&request);
        let resp = self.backend.send(provider_req).await?;
        parse_response("OpenAI", &resp)
    }
}
