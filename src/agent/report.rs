//! Analyst report synthesis
//!
//! A separate completion turns the collected observations into prose. The
//! instructions pin the output locale and forbid inventing numbers.

use crate::config::AppConfig;
use crate::llm::{ChatModel, CompletionRequest, GenerationOptions};
use crate::models::ChatMessage;
use crate::Result;
use std::sync::Arc;
use tracing::info;

const REPORT_TEMPERATURE: f32 = 0.1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSettings {
    pub language: String,
    pub disclaimer: String,
    pub missing_data_phrase: String,
}

impl ReportSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            language: config.report_language.clone(),
            disclaimer: config.report_disclaimer.clone(),
            missing_data_phrase: config.report_missing_data.clone(),
        }
    }

    fn system_rules(&self) -> String {
        format!(
            "TASK: Write a professional financial analyst report in {lang}.\n\n\
             RULES:\n\
             1. Write ONLY in {lang}.\n\
             2. Always use the numeric data (price, RSI, ...) in the report.\n\
             3. Add the \"{disclaimer}\" warning.\n\
             4. If data is missing, say \"{missing}\". Never invent numbers.",
            lang = self.language,
            disclaimer = self.disclaimer,
            missing = self.missing_data_phrase,
        )
    }
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            language: "Turkish".to_string(),
            disclaimer: "Yatırım Tavsiyesi Değildir (YTD)".to_string(),
            missing_data_phrase: "Veriye ulaşılamadı".to_string(),
        }
    }
}

pub struct ReportSynthesizer {
    model: Arc<dyn ChatModel>,
    settings: ReportSettings,
}

impl ReportSynthesizer {
    pub fn new(model: Arc<dyn ChatModel>, settings: ReportSettings) -> Self {
        Self { model, settings }
    }

    /// Report text exactly as the model wrote it.
    pub async fn synthesize(&self, question: &str, history: &str) -> Result<String> {
        info!(model = %self.model.name(), "Synthesizing analyst report");

        let request = CompletionRequest {
            messages: vec![
                ChatMessage::system(self.settings.system_rules()),
                ChatMessage::user(format!(
                    "QUESTION: {}\n\nCOLLECTED DATA:\n{}",
                    question, history
                )),
            ],
            options: GenerationOptions {
                temperature: REPORT_TEMPERATURE,
                ..GenerationOptions::default()
            },
        };

        self.model.complete(&request).await
    }
}
