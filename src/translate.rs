//! Query translation for knowledge base lookups
//!
//! The library is indexed in English while users mostly ask in Turkish.
//! Translation is best effort: any failure falls back to the original text.

use crate::error::AgentError;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

const GOOGLE_TRANSLATE_URL: &str = "https://translate.googleapis.com/translate_a/single";

#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str) -> Result<String>;
}

/// Translate, or return `text` unchanged when translation fails.
pub async fn to_english(translator: &dyn Translator, text: &str) -> String {
    match translator.translate(text).await {
        Ok(translated) if !translated.trim().is_empty() => {
            debug!(original = %text, translated = %translated, "Query translated");
            translated
        }
        Ok(_) => text.to_string(),
        Err(e) => {
            warn!(error = %e, "Translation failed, using original query");
            text.to_string()
        }
    }
}

/// Google's keyless `gtx` endpoint
pub struct GoogleTranslator {
    client: Client,
    endpoint: String,
    source: String,
    target: String,
}

impl GoogleTranslator {
    pub fn new(source: &str, target: &str) -> Result<Self> {
        Self::with_endpoint(GOOGLE_TRANSLATE_URL.to_string(), source, target)
    }

    pub fn with_endpoint(endpoint: String, source: &str, target: &str) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            client,
            endpoint,
            source: source.to_string(),
            target: target.to_string(),
        })
    }
}

/// Concatenate the translated segments of a `gtx` response.
fn parse_gtx_response(body: &Value) -> Result<String> {
    let segments = body
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| AgentError::TranslationError("unexpected response shape".to_string()))?;

    Ok(segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(Value::as_str))
        .collect::<String>())
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(&self, text: &str) -> Result<String> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("client", "gtx"),
                ("sl", self.source.as_str()),
                ("tl", self.target.as_str()),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AgentError::TranslationError(format!(
                "translate endpoint returned {}",
                response.status()
            )));
        }

        let body: Value = response.json().await?;
        parse_gtx_response(&body)
    }
}

/// Pass-through, used when translation is disabled
pub struct IdentityTranslator;

#[async_trait]
impl Translator for IdentityTranslator {
    async fn translate(&self, text: &str) -> Result<String> {
        Ok(text.to_string())
    }
}
