//! Environment configuration
//!
//! Every setting has a default so the agent runs against a local Ollama
//! instance with no `.env` at all.

use crate::error::AgentError;
use crate::Result;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    Ollama,
    Gemini,
}

impl FromStr for LlmProvider {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(LlmProvider::Ollama),
            "gemini" => Ok(LlmProvider::Gemini),
            other => Err(AgentError::ConfigError(format!(
                "unknown LLM_PROVIDER '{}' (expected 'ollama' or 'gemini')",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub llm_provider: LlmProvider,
    pub ollama_base_url: String,
    pub agent_model: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub embed_model: String,

    pub knowledge_db_path: PathBuf,
    pub knowledge_top_k: usize,
    pub translation_enabled: bool,

    pub serper_api_key: Option<String>,
    pub search_region: String,
    pub search_language: String,
    pub yahoo_search_url: String,
    pub yahoo_chart_url: String,

    pub max_turns: u32,
    pub report_language: String,
    pub report_disclaimer: String,
    pub report_missing_data: String,

    pub history_file: PathBuf,
    pub upload_dir: PathBuf,
    pub api_port: u16,

    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub ingest_batch_size: usize,
}

impl AppConfig {
    /// Read configuration from the process environment (after `.env` is loaded).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| -> String {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let llm_provider = get("LLM_PROVIDER", "ollama").parse()?;

        let api_port = lookup("PORT")
            .or_else(|| lookup("API_PORT"))
            .unwrap_or_else(|| "8080".to_string());

        Ok(Self {
            llm_provider,
            ollama_base_url: get("OLLAMA_BASE_URL", "http://localhost:11434")
                .trim_end_matches('/')
                .to_string(),
            agent_model: get("AGENT_MODEL", "qwen2.5:3b-instruct"),
            gemini_api_key: get("GEMINI_API_KEY", ""),
            gemini_model: get("GEMINI_MODEL", "gemini-2.0-flash"),
            embed_model: get("EMBED_MODEL", "all-minilm"),

            knowledge_db_path: PathBuf::from(get("KNOWLEDGE_DB_PATH", "./finance_db.sqlite")),
            knowledge_top_k: parse_value("KNOWLEDGE_TOP_K", &get("KNOWLEDGE_TOP_K", "4"))?,
            translation_enabled: parse_flag("TRANSLATION_ENABLED", &get("TRANSLATION_ENABLED", "true"))?,

            serper_api_key: lookup("SERPER_API_KEY").filter(|v| !v.trim().is_empty()),
            search_region: get("SEARCH_REGION", "tr"),
            search_language: get("SEARCH_LANGUAGE", "tr"),
            yahoo_search_url: get(
                "YAHOO_SEARCH_URL",
                "https://query2.finance.yahoo.com/v1/finance/search",
            ),
            yahoo_chart_url: get(
                "YAHOO_CHART_URL",
                "https://query1.finance.yahoo.com/v8/finance/chart",
            ),

            max_turns: parse_value("MAX_TURNS", &get("MAX_TURNS", "7"))?,
            report_language: get("REPORT_LANGUAGE", "Turkish"),
            report_disclaimer: get("REPORT_DISCLAIMER", "Yatırım Tavsiyesi Değildir (YTD)"),
            report_missing_data: get("REPORT_MISSING_DATA", "Veriye ulaşılamadı"),

            history_file: PathBuf::from(get("HISTORY_FILE", "chat_history.json")),
            upload_dir: PathBuf::from(get("UPLOAD_DIR", "temp_data")),
            api_port: parse_value("PORT", &api_port)?,

            chunk_size: parse_value("CHUNK_SIZE", &get("CHUNK_SIZE", "400"))?,
            chunk_overlap: parse_value("CHUNK_OVERLAP", &get("CHUNK_OVERLAP", "150"))?,
            ingest_batch_size: parse_value("INGEST_BATCH_SIZE", &get("INGEST_BATCH_SIZE", "25"))?,
        })
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim().parse::<T>().map_err(|_| {
        AgentError::ConfigError(format!("{} has an invalid value: '{}'", key, raw))
    })
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AgentError::ConfigError(format!(
            "{} must be a boolean, got '{}'",
            key, raw
        ))),
    }
}
