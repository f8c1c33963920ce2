//! Core data models for the research agent

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

//
// ================= Chat Messages =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

//
// ================= Parsed Model Output =================
//

/// A tool invocation extracted from model text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParsedAction {
    pub tool: String,
    pub argument: Option<String>,
}

/// What a single completion asks the loop to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentStep {
    FinalAnswer(String),
    Action(ParsedAction),
    Continue,
}

//
// ================= Tool Results =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Success,
    Failed,
    Skipped,
}

/// Observation produced by dispatching one action. Always carries text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_name: String,
    pub status: ExecutionStatus,
    pub output: String,
    pub execution_time_ms: u64,
}

impl fmt::Display for ToolResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.output)
    }
}

//
// ================= Transcript =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub step: u32,
    pub output: String,
    pub action: Option<ParsedAction>,
    pub observation: Option<String>,
}

/// Message history of one run. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new(system_prompt: &str, question: &str) -> Self {
        Self {
            messages: vec![
                ChatMessage::system(system_prompt),
                ChatMessage::user(format!("Question: {}", question)),
            ],
            turns: Vec::new(),
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn push_message(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn push_turn(&mut self, turn: Turn) {
        self.turns.push(turn);
    }
}

//
// ================= Run Trace =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TraceKind {
    User,
    Thought,
    Action,
    Observation,
    FinalAnswer,
}

impl fmt::Display for TraceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TraceKind::User => "User",
            TraceKind::Thought => "Thought",
            TraceKind::Action => "Action",
            TraceKind::Observation => "Observation",
            TraceKind::FinalAnswer => "Final Answer",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    pub kind: TraceKind,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

//
// ================= Final Result =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Answered,
    TurnLimitReached,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRun {
    pub answer: String,
    pub status: RunStatus,
    pub turns_used: u32,
    pub transcript: Transcript,
    pub trace: Vec<TraceEntry>,
}

impl AgentRun {
    /// Trace rendered as `[Kind]: message` lines for display next to the answer.
    pub fn render_trace(&self) -> String {
        self.trace
            .iter()
            .map(|entry| format!("[{}]: {}", entry.kind, entry.message))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
