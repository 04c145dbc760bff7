use std::sync::Arc;

use async_trait::async_trait;
use llmwire_core::{ChatModel, ChatRequest, ChatResponse, LlmError, Message, TokenUsage};
use llmwire_models::{ProviderBackend, ProviderRequest, ProviderResponse};
use serde_json::{json, Value};

pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub base_url: String,
}

impl OllamaConfig {
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_HOST.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self::new()
    }
}

pub struct OllamaChatModel {
    config: OllamaConfig,
    backend: Arc<dyn ProviderBackend>,
}

impl OllamaChatModel {
    pub fn new(config: OllamaConfig, backend: Arc<dyn ProviderBackend>) -> Self {
        Self { config, backend }
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    pub fn build_request(&self, request: &ChatRequest) -> ProviderRequest {
        let messages: Vec<Value> = request.messages.iter().map(message_to_ollama).collect();

        let mut body = json!({
            "model": request.model,
            "messages": messages,
            "stream": false,
        });

        {
            let opts = &request.options;
            let mut options = json!({});
            let mut has_options = false;
            if let Some(temp) = opts.temperature {
                options["temperature"] = json!(temp);
                has_options = true;
            }
            if let Some(max_tokens) = opts.max_tokens {
                options["num_predict"] = json!(max_tokens);
                has_options = true;
            }
            if let Some(top_p) = opts.top_p {
                options["top_p"] = json!(top_p);
                has_options = true;
            }
            if let Some(ref stop) = opts.stop {
                options["stop"] = json!(stop);
                has_options = true;
            }
            if let Some(seed) = opts.seed {
                options["seed"] = json!(seed);
                has_options = true;
            }
            if has_options {
                body["options"] = options;
            }
        }
        // Passthrough fields (`format`, `keep_alive`, ...) live at the top level.
        for (key, value) in &request.options.extra {
            body[key.as_str()] = value.clone();
        }

        ProviderRequest {
            url: format!("{}/api/chat", self.config.base_url.trim_end_matches('/')),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body,
        }
    }
}

fn message_to_ollama(msg: &Message) -> Value {
    json!({
        "role": msg.role.as_str(),
        "content": msg.content,
    })
}

fn parse_response(resp: &ProviderResponse) -> Result<ChatResponse, LlmError> {
    resp.error_for_status("Ollama")?;

    let content = resp.body["message"]["content"].as_str().ok_or_else(|| {
        LlmError::Parsing("Ollama response is missing 'message.content'".to_string())
    })?;

    Ok(ChatResponse {
        content: content.to_string(),
        usage: parse_usage(&resp.body),
    })
}

fn parse_usage(body: &Value) -> Option<TokenUsage> {
    let input = body["prompt_eval_count"].as_u64();
    let output = body["eval_count"].as_u64();
    if input.is_none() && output.is_none() {
        return None;
    }
    let input = input.unwrap_or(0) as u32;
    let output = output.unwrap_or(0) as u32;
    Some(TokenUsage {
        input_tokens: input,
        output_tokens: output,
        total_tokens: input + output,
    })
}

#[async_trait]
impl ChatModel for OllamaChatModel {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, LlmError> {
        let provider_req = self.build_request(&request);
        let resp = self.backend.send(provider_req).await?;
        parse_response(&resp)
    }
}
