//! Chat session storage
//!
//! Sessions live in memory behind a `RwLock`; the JSON-file backend rewrites
//! the whole log after every change.

use crate::error::AgentError;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const DEFAULT_TITLE: &str = "New Chat";
const TITLE_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionMessage {
    pub role: SessionRole,
    pub content: String,
    /// Rendered agent trace shown under assistant answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thoughts: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl SessionMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: SessionRole::User,
            content: content.into(),
            thoughts: None,
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>, thoughts: Option<String>) -> Self {
        Self {
            role: SessionRole::Assistant,
            content: content.into(),
            thoughts: thoughts.filter(|t| !t.trim().is_empty()),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub messages: Vec<SessionMessage>,
}

impl Session {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            title: DEFAULT_TITLE.to_string(),
            created_at: Utc::now(),
            messages: Vec::new(),
        }
    }
}

/// Sidebar entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSummary {
    pub id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub message_count: usize,
}

/// First 20 characters of the prompt, with `...` when it was cut.
pub fn title_from_prompt(prompt: &str) -> String {
    if prompt.chars().count() > TITLE_LIMIT {
        format!("{}...", prompt.chars().take(TITLE_LIMIT).collect::<String>())
    } else {
        prompt.to_string()
    }
}

enum SessionBackend {
    InMemory,
    JsonFile { path: PathBuf },
}

pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Session>>,
    backend: SessionBackend,
}

impl SessionStore {
    pub fn in_memory() -> Self {
        info!("Session store backend: in-memory");
        Self {
            sessions: RwLock::new(HashMap::new()),
            backend: SessionBackend::InMemory,
        }
    }

    /// Load the log at `path`. A missing file starts empty; an unreadable
    /// one is logged and replaced on the next write.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let sessions = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => match serde_json::from_str::<HashMap<Uuid, Session>>(&raw) {
                Ok(sessions) => sessions,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Session log unreadable, starting empty");
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        info!(path = %path.display(), sessions = sessions.len(), "Session store backend: json file");

        Ok(Self {
            sessions: RwLock::new(sessions),
            backend: SessionBackend::JsonFile { path },
        })
    }

    async fn persist(&self, sessions: &HashMap<Uuid, Session>) -> Result<()> {
        let SessionBackend::JsonFile { path } = &self.backend else {
            return Ok(());
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(sessions)?;
        tokio::fs::write(path, json).await?;
        debug!(path = %path.display(), sessions = sessions.len(), "Session log written");
        Ok(())
    }

    pub async fn create(&self) -> Result<Session> {
        let session = Session::new(Uuid::new_v4());
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.id, session.clone());
        self.persist(&sessions).await?;
        Ok(session)
    }

    pub async fn get(&self, id: Uuid) -> Option<Session> {
        self.sessions.read().await.get(&id).cloned()
    }

    pub async fn get_or_create(&self, id: Uuid) -> Result<Session> {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get(&id) {
            return Ok(session.clone());
        }

        let session = Session::new(id);
        sessions.insert(id, session.clone());
        self.persist(&sessions).await?;
        Ok(session)
    }

    /// Newest first.
    pub async fn list(&self) -> Vec<SessionSummary> {
        let sessions = self.sessions.read().await;
        let mut summaries: Vec<SessionSummary> = sessions
            .values()
            .map(|s| SessionSummary {
                id: s.id,
                title: s.title.clone(),
                created_at: s.created_at,
                message_count: s.messages.len(),
            })
            .collect();

        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        summaries
    }

    /// Append a user prompt; the first exchange names the session.
    pub async fn push_user_message(&self, id: Uuid, prompt: &str) -> Result<Session> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(id)
            .or_insert_with(|| Session::new(id));

        session.messages.push(SessionMessage::user(prompt));
        if session.messages.len() <= 2 {
            session.title = title_from_prompt(prompt);
        }

        let updated = session.clone();
        self.persist(&sessions).await?;
        Ok(updated)
    }

    pub async fn push_assistant_message(
        &self,
        id: Uuid,
        answer: &str,
        thoughts: Option<String>,
    ) -> Result<Session> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| AgentError::SessionNotFound(id.to_string()))?;

        session.messages.push(SessionMessage::assistant(answer, thoughts));

        let updated = session.clone();
        self.persist(&sessions).await?;
        Ok(updated)
    }

    /// Drop every session and remove the log file.
    pub async fn clear(&self) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.clear();

        if let SessionBackend::JsonFile { path } = &self.backend {
            match tokio::fs::remove_file(path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        info!("Session history cleared");
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    #[test]
    fn test_title_truncation() {
        assert_eq!(title_from_prompt("Aselsan?"), "Aselsan?");
        assert_eq!(
            title_from_prompt("Aselsan hissesi bugün ne durumda?"),
            "Aselsan hissesi bugü..."
        );
        assert_eq!(title_from_prompt("çok uzun türkçe karakterli başlık"), "çok uzun türkçe kara...");
    }

    #[tokio::test]
    async fn test_first_exchange_sets_title_only() {
        let store = SessionStore::in_memory();
        let session = store.create().await.unwrap();
        assert_eq!(session.title, DEFAULT_TITLE);

        store.push_user_message(session.id, "first question").await.unwrap();
        store
            .push_assistant_message(session.id, "answer", Some("[Thought]: x".into()))
            .await
            .unwrap();
        let updated = store.push_user_message(session.id, "second question").await.unwrap();

        assert_eq!(updated.title, "first question");
        assert_eq!(updated.messages.len(), 3);
        assert_eq!(updated.messages[1].thoughts.as_deref(), Some("[Thought]: x"));
    }

    #[tokio::test]
    async fn test_assistant_message_requires_session() {
        let store = SessionStore::in_memory();
        let err = store
            .push_assistant_message(Uuid::new_v4(), "x", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let store = SessionStore::in_memory();
        let older = store.create().await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let newer = store.create().await.unwrap();

        let ids: Vec<Uuid> = store.list().await.into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);
    }

    #[tokio::test]
    async fn test_json_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat_history.json");

        let id = {
            let store = SessionStore::open(&path).await.unwrap();
            let session = store.create().await.unwrap();
            assert_ok!(store.push_user_message(session.id, "Dolar kuru nedir bugün acaba?").await);
            assert_ok!(store.push_assistant_message(session.id, "35.50 TL", None).await);
            session.id
        };

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\n  "), "log should be pretty-printed");
        assert!(!raw.contains("\"thoughts\""));

        let reopened = SessionStore::open(&path).await.unwrap();
        let session = reopened.get(id).await.unwrap();
        assert_eq!(session.title, "Dolar kuru nedir bug...");
        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.messages[1].role, SessionRole::Assistant);
    }

    #[tokio::test]
    async fn test_corrupt_file_starts_empty_and_clear_removes_it() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat_history.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = SessionStore::open(&path).await.unwrap();
        assert!(store.is_empty().await);

        store.create().await.unwrap();
        assert!(path.exists());

        store.clear().await.unwrap();
        assert!(!path.exists());
        assert_eq!(store.len().await, 0);
    }
}
