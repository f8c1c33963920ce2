//! Ollama chat client
//!
//! Talks to a local Ollama server over `/api/chat` with streaming disabled.

use crate::error::AgentError;
use crate::llm::{ChatModel, CompletionRequest};
use crate::models::ChatMessage;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

/// Reusable Ollama client (connection-pooled)
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(base_url: String, model: String) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(4)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        })
    }
}

#[async_trait]
impl ChatModel for OllamaClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);

        let body = OllamaChatRequest {
            model: &self.model,
            messages: &request.messages,
            stream: false,
            options: OllamaOptions {
                temperature: request.options.temperature,
                num_ctx: request.options.num_ctx,
                stop: &request.options.stop,
            },
        };

        debug!(
            model = %self.model,
            messages = request.messages.len(),
            "Calling Ollama chat API"
        );

        let response = self.client.post(&url).json(&body).send().await.map_err(|e| {
            error!("Ollama request failed: {}", e);
            AgentError::LlmError(format!("Ollama request failed: {}", e))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Ollama error response ({}): {}", status, error_text);
            return Err(AgentError::LlmError(format!(
                "Ollama returned {}: {}",
                status, error_text
            )));
        }

        let parsed: OllamaChatResponse = response.json().await.map_err(|e| {
            AgentError::LlmError(format!("Ollama parse error: {}", e))
        })?;

        Ok(parsed.message.content)
    }
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: OllamaOptions<'a>,
}

#[derive(Debug, Serialize)]
struct OllamaOptions<'a> {
    temperature: f32,
    num_ctx: u32,
    stop: &'a [String],
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: ChatMessage,
}
