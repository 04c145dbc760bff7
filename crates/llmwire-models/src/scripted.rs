use std::{collections::VecDeque, sync::Arc};

use async_trait::async_trait;
use llmwire_core::{ChatModel, ChatRequest, ChatResponse, LlmError};
use tokio::sync::Mutex;

/// A chat model that replays queued responses and records what it was asked.
#[derive(Clone)]
pub struct ScriptedChatModel {
    responses: Arc<Mutex<VecDeque<Result<ChatResponse, LlmError>>>>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
}

impl ScriptedChatModel {
    pub fn new(responses: Vec<ChatResponse>) -> Self {
        Self::with_results(responses.into_iter().map(Ok).collect())
    }

    pub fn with_results(results: Vec<Result<ChatResponse, LlmError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::from(results))),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Requests received so far, oldest first.
    pub async fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }
}

#[async_trait]
impl ChatModel for ScriptedChatModel {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, LlmError> {
        self.requests.lock().await.push(request);
        let mut responses = self.responses.lock().await;
        responses.pop_front().unwrap_or_else(|| {
            Err(LlmError::Parsing(
                "scripted model exhausted responses".to_string(),
            ))
        })
    }
}
