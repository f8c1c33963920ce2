//! Research loop
//!
//! THINK → ACT → OBSERVE, repeated until the model writes a final answer or
//! the turn budget runs out. Each turn is one completion stopped at
//! `Observation:`; the loop supplies the observation itself.

pub mod prompts;
pub mod report;

pub use prompts::build_system_prompt;
pub use report::{ReportSettings, ReportSynthesizer};

use crate::config::AppConfig;
use crate::error::AgentError;
use crate::execution::ExecutionEngine;
use crate::knowledge::{ChunkStore, KnowledgeRetriever, OllamaEmbeddings};
use crate::llm::{create_model, ChatModel, CompletionRequest, GenerationOptions};
use crate::models::{
    AgentRun, AgentStep, ChatMessage, RunStatus, TraceEntry, TraceKind, Transcript, Turn,
};
use crate::parser::{extract_thought, parse_step, OBSERVATION_MARKER};
use crate::tools::{create_default_registry, ToolRegistry};
use crate::translate::{GoogleTranslator, IdentityTranslator, Translator};
use crate::Result;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

pub const TURN_LIMIT_MESSAGE: &str = "Process time limit reached.";
pub const CONTINUE_PROMPT: &str = "Please continue with an Action.";

const CONTEXT_WINDOW: u32 = 4096;

pub struct FinancialAgent {
    model: Arc<dyn ChatModel>,
    execution_engine: ExecutionEngine,
    synthesizer: ReportSynthesizer,
    system_prompt: String,
    max_turns: u32,
}

impl FinancialAgent {
    pub fn new(
        model: Arc<dyn ChatModel>,
        tool_registry: ToolRegistry,
        report_settings: ReportSettings,
        max_turns: u32,
    ) -> Self {
        let system_prompt = build_system_prompt(&tool_registry);

        Self {
            synthesizer: ReportSynthesizer::new(model.clone(), report_settings),
            model,
            execution_engine: ExecutionEngine::new(tool_registry),
            system_prompt,
            max_turns,
        }
    }

    /// Wire the configured model, knowledge base and toolset together.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let model = create_model(config)?;

        let store = ChunkStore::open(&config.knowledge_db_path).await?;
        let embedder = Arc::new(OllamaEmbeddings::new(
            config.ollama_base_url.clone(),
            config.embed_model.clone(),
        )?);
        let translator: Arc<dyn Translator> = if config.translation_enabled {
            Arc::new(GoogleTranslator::new("tr", "en")?)
        } else {
            Arc::new(IdentityTranslator)
        };
        let retriever = Arc::new(KnowledgeRetriever::new(store, embedder, translator));

        let registry = create_default_registry(config, retriever)?;
        info!(model = %model.name(), tools = registry.len(), "Agent initialized");

        Ok(Self::new(
            model,
            registry,
            ReportSettings::from_config(config),
            config.max_turns,
        ))
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn max_turns(&self) -> u32 {
        self.max_turns
    }

    /// Run the loop for one question.
    ///
    /// Tool problems never fail the run; only model transport errors do.
    pub async fn run(&self, question: &str) -> Result<AgentRun> {
        let mut trace = Vec::new();
        let mut transcript = Transcript::new(&self.system_prompt, question);
        let mut history = String::new();

        record(&mut trace, TraceKind::User, question);
        info!(model = %self.model.name(), max_turns = self.max_turns, "Agent run started");

        for step in 1..=self.max_turns {
            let output = self.next_completion(&transcript).await?;
            record(&mut trace, TraceKind::Thought, extract_thought(&output));

            match parse_step(&output) {
                AgentStep::FinalAnswer(answer) => {
                    history.push_str(&format!("\n[Result]: {}", answer));
                    transcript.push_turn(Turn {
                        step,
                        output,
                        action: None,
                        observation: None,
                    });

                    let report = self.synthesizer.synthesize(question, &history).await?;
                    record(&mut trace, TraceKind::FinalAnswer, &report);
                    info!(step, "Final answer reached");

                    return Ok(AgentRun {
                        answer: report,
                        status: RunStatus::Answered,
                        turns_used: step,
                        transcript,
                        trace,
                    });
                }

                AgentStep::Action(action) => {
                    let argument = action.argument.as_deref();
                    record(
                        &mut trace,
                        TraceKind::Action,
                        &format!("{} -> {}", action.tool, argument.unwrap_or("None")),
                    );

                    let result = self
                        .execution_engine
                        .dispatch(&action.tool, argument)
                        .await;
                    record(&mut trace, TraceKind::Observation, &result.output);

                    history.push_str(&format!(
                        "\n[Step {}]\nCall: {}('{}')\nData: {}\n",
                        step,
                        action.tool,
                        argument.unwrap_or_default(),
                        result.output
                    ));

                    transcript.push_message(ChatMessage::assistant(format!(
                        "{}\n{} {}",
                        output, OBSERVATION_MARKER, result.output
                    )));
                    transcript.push_turn(Turn {
                        step,
                        output,
                        action: Some(action),
                        observation: Some(result.output),
                    });
                }

                AgentStep::Continue => {
                    transcript.push_message(ChatMessage::user(CONTINUE_PROMPT));
                    transcript.push_turn(Turn {
                        step,
                        output,
                        action: None,
                        observation: None,
                    });
                }
            }
        }

        warn!(max_turns = self.max_turns, "Turn budget exhausted without a final answer");

        Ok(AgentRun {
            answer: TURN_LIMIT_MESSAGE.to_string(),
            status: RunStatus::TurnLimitReached,
            turns_used: self.max_turns,
            transcript,
            trace,
        })
    }

    async fn next_completion(&self, transcript: &Transcript) -> Result<String> {
        let request = CompletionRequest {
            messages: transcript.messages().to_vec(),
            options: GenerationOptions {
                temperature: 0.0,
                num_ctx: CONTEXT_WINDOW,
                stop: vec![OBSERVATION_MARKER.to_string()],
            },
        };

        let output = self.model.complete(&request).await.map_err(|e| match e {
            AgentError::LlmError(_) => e,
            other => AgentError::LlmError(other.to_string()),
        })?;

        Ok(output.trim().to_string())
    }
}

fn record(trace: &mut Vec<TraceEntry>, kind: TraceKind, message: &str) {
    info!(kind = %kind, "{}", message);
    trace.push(TraceEntry {
        kind,
        message: message.to_string(),
        created_at: Utc::now(),
    });
}
