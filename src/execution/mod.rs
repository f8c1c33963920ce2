//! Tool dispatch
//!
//! Turns a parsed action into observation text. Dispatch never fails:
//! unknown tools, missing arguments and tool errors all become observations
//! the model can read on its next turn.

use crate::error::AgentError;
use crate::models::{ExecutionStatus, ToolResult};
use crate::tools::ToolRegistry;
use std::time::Instant;
use tracing::{debug, warn};

pub const MISSING_ARGUMENT: &str = "Error: Missing argument.";

pub struct ExecutionEngine {
    tool_registry: ToolRegistry,
}

impl ExecutionEngine {
    pub fn new(tool_registry: ToolRegistry) -> Self {
        Self { tool_registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.tool_registry
    }

    /// Run `tool_name` with `argument` and capture the outcome as text.
    pub async fn dispatch(&self, tool_name: &str, argument: Option<&str>) -> ToolResult {
        let start = Instant::now();

        let (status, output) = match self.tool_registry.get(tool_name) {
            None => {
                warn!(tool_name = %tool_name, "Tool not registered");
                (
                    ExecutionStatus::Skipped,
                    format!("Error: Tool '{}' not found.", tool_name),
                )
            }
            Some(_) if argument.is_none() => {
                warn!(tool_name = %tool_name, "Action without argument");
                (ExecutionStatus::Skipped, MISSING_ARGUMENT.to_string())
            }
            Some(tool) => {
                let argument = argument.unwrap_or_default();
                debug!(tool_name = %tool_name, argument = %argument, "Executing tool");

                match tool.execute(argument).await {
                    Ok(output) => (ExecutionStatus::Success, output),
                    Err(e) => {
                        warn!(tool_name = %tool_name, error = %e, "Tool execution failed");
                        let message = match e {
                            AgentError::ToolError(message) => message,
                            other => other.to_string(),
                        };
                        (ExecutionStatus::Failed, format!("Tool Error: {}", message))
                    }
                }
            }
        };

        ToolResult {
            tool_name: tool_name.to_string(),
            status,
            output,
            execution_time_ms: start.elapsed().as_millis() as u64,
        }
    }
}
