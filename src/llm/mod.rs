//! Chat model trait and implementations
//!
//! The agent loop and the report synthesizer only see `ChatModel`.
//! Concrete clients talk to Ollama (default) or Gemini.

use crate::config::{AppConfig, LlmProvider};
use crate::error::AgentError;
use crate::models::ChatMessage;
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub mod gemini;
pub mod ollama;

pub use gemini::GeminiClient;
pub use ollama::OllamaClient;

/// Decoding options for one completion
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub num_ctx: u32,
    pub stop: Vec<String>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            num_ctx: 4096,
            stop: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub options: GenerationOptions,
}

/// Text completion over a chat history
#[async_trait]
pub trait ChatModel: Send + Sync {
    fn name(&self) -> &str;
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

/// Build the configured chat model.
pub fn create_model(config: &AppConfig) -> Result<Arc<dyn ChatModel>> {
    match config.llm_provider {
        LlmProvider::Ollama => Ok(Arc::new(OllamaClient::new(
            config.ollama_base_url.clone(),
            config.agent_model.clone(),
        )?)),
        LlmProvider::Gemini => Ok(Arc::new(GeminiClient::new(
            config.gemini_api_key.clone(),
            config.gemini_model.clone(),
        )?)),
    }
}

/// Scripted model for development & testing
/// Replies are consumed in order; every request is recorded.
#[derive(Default)]
pub struct MockModel {
    replies: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockModel {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl ChatModel for MockModel {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        self.replies
            .lock()
            .map_err(|_| AgentError::LlmError("mock model lock poisoned".to_string()))?
            .pop_front()
            .ok_or_else(|| AgentError::LlmError("mock model has no scripted replies left".to_string()))
    }
}
