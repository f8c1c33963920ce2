//! Conversation service
//!
//! Connects chat sessions to the research agent: records the prompt, adds an
//! upload hint when a CSV is attached, runs the agent and stores the answer
//! with its rendered trace.

use crate::agent::FinancialAgent;
use crate::error::AgentError;
use crate::memory::SessionStore;
use crate::models::RunStatus;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// A CSV the user attached to the conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationalResponse {
    pub session_id: Uuid,
    pub answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thoughts: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RunStatus>,
}

/// Prompt with the upload hint appended.
pub fn prompt_with_upload(prompt: &str, upload: Option<&UploadedFile>) -> String {
    match upload {
        Some(file) => format!(
            "{}\n\n[SYSTEM: The user uploaded the file '{}'. File path: '{}'. If file analysis is requested, use the 'analyze_full_csv' tool.]",
            prompt,
            file.name,
            file.path.display()
        ),
        None => prompt.to_string(),
    }
}

pub struct ConversationService {
    agent: Arc<FinancialAgent>,
    sessions: Arc<SessionStore>,
    upload_dir: PathBuf,
}

impl ConversationService {
    pub fn new(agent: Arc<FinancialAgent>, sessions: Arc<SessionStore>, upload_dir: PathBuf) -> Self {
        Self {
            agent,
            sessions,
            upload_dir,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// One chat exchange. Agent failures are answered as `Error: ...` text.
    pub async fn ask(
        &self,
        session_id: Uuid,
        prompt: &str,
        upload: Option<&UploadedFile>,
    ) -> Result<ConversationalResponse> {
        self.sessions.push_user_message(session_id, prompt).await?;

        let question = prompt_with_upload(prompt, upload);
        info!(session_id = %session_id, has_upload = upload.is_some(), "Running agent for chat message");

        let (answer, thoughts, status) = match self.agent.run(&question).await {
            Ok(run) => {
                let trace = run.render_trace();
                (run.answer, Some(trace), Some(run.status))
            }
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Agent run failed");
                (format!("Error: {}", e), None, None)
            }
        };

        self.sessions
            .push_assistant_message(session_id, &answer, thoughts.clone())
            .await?;

        Ok(ConversationalResponse {
            session_id,
            answer,
            thoughts,
            status,
        })
    }

    /// Store an uploaded CSV under the upload directory.
    pub async fn save_upload(&self, file_name: &str, bytes: &[u8]) -> Result<UploadedFile> {
        let name = Path::new(file_name)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| AgentError::InvalidUpload("file name is empty".to_string()))?;

        if !name.to_lowercase().ends_with(".csv") {
            return Err(AgentError::InvalidUpload(format!(
                "only .csv uploads are accepted, got '{}'",
                name
            )));
        }

        tokio::fs::create_dir_all(&self.upload_dir).await?;
        let path = self.upload_dir.join(&name);
        tokio::fs::write(&path, bytes).await?;

        info!(path = %path.display(), bytes = bytes.len(), "Upload stored");
        Ok(UploadedFile { name, path })
    }

    /// Remove every session and every uploaded file.
    pub async fn clear_history(&self) -> Result<()> {
        self.sessions.clear().await?;

        match tokio::fs::remove_dir_all(&self.upload_dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        tokio::fs::create_dir_all(&self.upload_dir).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::ReportSettings;
    use crate::llm::MockModel;
    use crate::memory::SessionRole;
    use crate::tools::{AnalyzeFullCsvTool, ToolRegistry};

    fn service(model: Arc<MockModel>, upload_dir: PathBuf) -> ConversationService {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(AnalyzeFullCsvTool));
        let agent = FinancialAgent::new(model, registry, ReportSettings::default(), 7);
        ConversationService::new(Arc::new(agent), Arc::new(SessionStore::in_memory()), upload_dir)
    }

    #[test]
    fn test_upload_hint() {
        let file = UploadedFile {
            name: "prices.csv".to_string(),
            path: PathBuf::from("temp_data/prices.csv"),
        };
        let prompt = prompt_with_upload("Dosyayı yorumla", Some(&file));
        assert!(prompt.starts_with("Dosyayı yorumla\n\n[SYSTEM:"));
        assert!(prompt.contains("'prices.csv'"));
        assert!(prompt.contains("'temp_data/prices.csv'"));
        assert!(prompt.contains("analyze_full_csv"));
        assert_eq!(prompt_with_upload("hi", None), "hi");
    }

    #[tokio::test]
    async fn test_ask_records_exchange() {
        let dir = tempfile::tempdir().unwrap();
        let model = Arc::new(MockModel::new(["Final Answer: 42", "Rapor: 42"]));
        let service = service(model, dir.path().join("uploads"));

        let id = Uuid::new_v4();
        let response = service.ask(id, "What is the answer?", None).await.unwrap();
        assert_eq!(response.answer, "Rapor: 42");
        assert_eq!(response.status, Some(RunStatus::Answered));

        let session = service.sessions().get(id).await.unwrap();
        assert_eq!(session.title, "What is the answer?");
        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.messages[1].role, SessionRole::Assistant);
        assert!(session.messages[1]
            .thoughts
            .as_deref()
            .unwrap()
            .contains("[Final Answer]: Rapor: 42"));
    }

    #[tokio::test]
    async fn test_agent_error_becomes_answer() {
        let dir = tempfile::tempdir().unwrap();
        let model = Arc::new(MockModel::new(Vec::<String>::new()));
        let service = service(model, dir.path().join("uploads"));

        let response = service.ask(Uuid::new_v4(), "q", None).await.unwrap();
        assert!(response.answer.starts_with("Error: LLM error:"));
        assert!(response.thoughts.is_none());
    }

    #[tokio::test]
    async fn test_save_upload_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = dir.path().join("uploads");
        let service = service(Arc::new(MockModel::default()), uploads.clone());

        let file = service.save_upload("../prices.csv", b"a\n1\n").await.unwrap();
        assert_eq!(file.name, "prices.csv");
        assert_eq!(file.path, uploads.join("prices.csv"));

        assert!(service.save_upload("notes.txt", b"x").await.is_err());

        service.clear_history().await.unwrap();
        assert!(uploads.exists());
        assert!(!file.path.exists());
    }
}
