//! Web search tool (Serper Google Search API)

use crate::error::AgentError;
use crate::tools::Tool;
use crate::Result;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

const SERPER_URL: &str = "https://google.serper.dev/search";
const RESULT_COUNT: u32 = 4;

pub struct WebSearchTool {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    region: String,
    language: String,
}

impl WebSearchTool {
    pub fn new(api_key: Option<String>, region: String, language: String) -> Result<Self> {
        Self::with_endpoint(SERPER_URL.to_string(), api_key, region, language)
    }

    pub fn with_endpoint(
        endpoint: String,
        api_key: Option<String>,
        region: String,
        language: String,
    ) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            api_key,
            region,
            language,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SerperResponse {
    answer_box: Option<AnswerBox>,
    #[serde(default)]
    organic: Vec<OrganicResult>,
}

#[derive(Debug, Deserialize)]
struct AnswerBox {
    answer: Option<String>,
    snippet: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    date: String,
}

fn summarize_results(results: &SerperResponse) -> String {
    let mut summary = String::new();

    // First non-empty of answer, snippet, title.
    if let Some(answer) = results.answer_box.as_ref().and_then(|b| {
        [&b.answer, &b.snippet, &b.title]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|s| !s.trim().is_empty())
    }) {
        summary.push_str(&format!("[DIRECT ANSWER]: {}\n\n", answer));
    }

    for res in &results.organic {
        summary.push_str(&format!("- {} ({}): {}\n", res.title, res.date, res.snippet));
    }

    if summary.is_empty() {
        return "No relevant results found on Google.".to_string();
    }

    summary
}

#[async_trait::async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &'static str {
        "search_general_info"
    }

    fn description(&self) -> &'static str {
        "Searches the internet for current news, macroeconomic events, or specific details. Input: A search query string (e.g., 'Fed interest rate decision')."
    }

    async fn execute(&self, argument: &str) -> Result<String> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            AgentError::ToolError("SERPER_API_KEY is not configured".to_string())
        })?;

        debug!(query = %argument, "Running web search");

        let response = self
            .client
            .post(&self.endpoint)
            .header("X-API-KEY", api_key)
            .json(&json!({
                "q": argument,
                "gl": self.region,
                "hl": self.language,
                "num": RESULT_COUNT,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AgentError::ToolError(format!(
                "Search API returned {}",
                response.status()
            )));
        }

        let results: SerperResponse = response.json().await?;
        Ok(summarize_results(&results))
    }
}
