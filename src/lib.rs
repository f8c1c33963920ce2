//! Financial Research Agent
//!
//! A ReAct-style research assistant that:
//! - Drives a language model through a think → act → observe text protocol
//! - Dispatches market data, web search, knowledge base and CSV tools
//! - Synthesizes the collected observations into an analyst report
//! - Keeps chat sessions and uploads behind a small HTTP API
//!
//! LOOP:
//! QUESTION → THOUGHT → ACTION → OBSERVATION → ... → FINAL ANSWER → REPORT

pub mod agent;
pub mod api;
pub mod config;
pub mod conversational;
pub mod error;
pub mod execution;
pub mod knowledge;
pub mod llm;
pub mod memory;
pub mod models;
pub mod parser;
pub mod tools;
pub mod translate;

pub use error::Result;

// Re-export common types
pub use agent::FinancialAgent;
pub use config::AppConfig;
pub use models::*;
