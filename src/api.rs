//! REST API for the research assistant
//!
//! Chat, session history and CSV uploads over HTTP. Every response except
//! `/health` uses the [`ApiResponse`] envelope.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::conversational::{ConversationService, UploadedFile};

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatRequest {
    pub session_id: Option<String>,
    pub message: String,
    pub file_path: Option<String>,
    pub file_name: Option<String>,
}

impl ChatRequest {
    fn upload(&self) -> Option<UploadedFile> {
        let path = self.file_path.as_deref().filter(|p| !p.trim().is_empty())?;
        let path = PathBuf::from(path.trim());
        let name = self
            .file_name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .or_else(|| path.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_else(|| path.display().to_string());

        Some(UploadedFile { name, path })
    }
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

type ApiResult = (StatusCode, Json<ApiResponse>);

fn ok<T: Serialize>(data: T) -> ApiResult {
    (StatusCode::OK, Json(ApiResponse::success(data)))
}

fn fail(status: StatusCode, message: String) -> ApiResult {
    (status, Json(ApiResponse::error(message)))
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub service: Arc<ConversationService>,
}

/// =============================
/// Helpers
/// =============================

fn stable_uuid_from_string(input: &str) -> Uuid {
    use sha2::{Digest, Sha256};

    let hash = Sha256::digest(input.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash[..16]);

    // Set UUID version (4) and variant (RFC4122) bits.
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    Uuid::from_bytes(bytes)
}

/// Session ids from clients may be arbitrary strings; non-UUIDs map to a
/// stable UUID so the same string always reaches the same session.
pub fn parse_or_stable_uuid(value: &str) -> Uuid {
    Uuid::parse_str(value.trim()).unwrap_or_else(|_| stable_uuid_from_string(value.trim()))
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Chat Endpoint
/// =============================

async fn chat_handler(State(state): State<ApiState>, Json(req): Json<ChatRequest>) -> ApiResult {
    let message = req.message.trim();
    if message.is_empty() {
        return fail(StatusCode::BAD_REQUEST, "Message is empty".into());
    }

    let session_id = match req.session_id.as_deref().filter(|v| !v.trim().is_empty()) {
        Some(value) => parse_or_stable_uuid(value),
        None => Uuid::new_v4(),
    };

    info!(session_id = %session_id, "Received chat message");
    let upload = req.upload();

    match state.service.ask(session_id, message, upload.as_ref()).await {
        Ok(response) => ok(response),
        Err(e) => fail(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Chat failed: {}", e),
        ),
    }
}

/// =============================
/// Session Endpoints
/// =============================

async fn list_sessions(State(state): State<ApiState>) -> ApiResult {
    ok(state.service.sessions().list().await)
}

async fn create_session(State(state): State<ApiState>) -> ApiResult {
    match state.service.sessions().create().await {
        Ok(session) => ok(session),
        Err(e) => fail(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Could not create session: {}", e),
        ),
    }
}

async fn get_session(State(state): State<ApiState>, Path(id): Path<String>) -> ApiResult {
    let session_id = parse_or_stable_uuid(&id);
    match state.service.sessions().get(session_id).await {
        Some(session) => ok(session),
        None => fail(StatusCode::NOT_FOUND, format!("Session not found: {}", id)),
    }
}

async fn clear_sessions(State(state): State<ApiState>) -> ApiResult {
    match state.service.clear_history().await {
        Ok(()) => ok(serde_json::json!({ "cleared": true })),
        Err(e) => fail(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Could not clear history: {}", e),
        ),
    }
}

/// =============================
/// Upload Endpoint
/// =============================

async fn upload_file(
    State(state): State<ApiState>,
    Path(file_name): Path<String>,
    body: Bytes,
) -> ApiResult {
    match state.service.save_upload(&file_name, &body).await {
        Ok(file) => ok(file),
        Err(e) => {
            warn!(file_name = %file_name, error = %e, "Upload rejected");
            fail(StatusCode::BAD_REQUEST, format!("Upload failed: {}", e))
        }
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(service: Arc<ConversationService>) -> Router {
    let state = ApiState { service };

    Router::new()
        .route("/health", get(health))
        .route("/api/chat", post(chat_handler))
        .route(
            "/api/sessions",
            get(list_sessions).post(create_session).delete(clear_sessions),
        )
        .route("/api/sessions/:id", get(get_session))
        .route("/api/uploads/:file_name", post(upload_file))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    service: Arc<ConversationService>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(service);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{FinancialAgent, ReportSettings};
    use crate::llm::MockModel;
    use crate::memory::SessionStore;
    use crate::tools::ToolRegistry;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn router(replies: Vec<&str>, upload_dir: PathBuf) -> Router {
        let agent = FinancialAgent::new(
            Arc::new(MockModel::new(replies)),
            ToolRegistry::new(),
            ReportSettings::default(),
            7,
        );
        let service = ConversationService::new(
            Arc::new(agent),
            Arc::new(SessionStore::in_memory()),
            upload_dir,
        );
        create_router(Arc::new(service))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_stable_uuid() {
        let a = parse_or_stable_uuid("my-chat");
        assert_eq!(a, parse_or_stable_uuid("my-chat"));
        assert_ne!(a, parse_or_stable_uuid("other-chat"));

        let real = Uuid::new_v4();
        assert_eq!(parse_or_stable_uuid(&real.to_string()), real);
    }

    #[test]
    fn test_upload_from_request() {
        let req = ChatRequest {
            session_id: None,
            message: "m".into(),
            file_path: Some("temp_data/prices.csv".into()),
            file_name: None,
        };
        let upload = req.upload().unwrap();
        assert_eq!(upload.name, "prices.csv");

        let no_file = ChatRequest { file_path: Some(" ".into()), ..req };
        assert!(no_file.upload().is_none());
    }

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let response = router(vec![], dir.path().to_path_buf())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let response = router(vec![], dir.path().to_path_buf())
            .oneshot(
                Request::post("/api/chat")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"message":"   "}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["success"], false);
    }

    #[tokio::test]
    async fn test_unknown_session_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let response = router(vec![], dir.path().to_path_buf())
            .oneshot(
                Request::get(format!("/api/sessions/{}", Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_upload_only_accepts_csv() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(vec![], dir.path().join("uploads"));

        let rejected = app
            .clone()
            .oneshot(
                Request::post("/api/uploads/report.pdf")
                    .body(Body::from("x"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);

        let accepted = app
            .oneshot(
                Request::post("/api/uploads/prices.csv")
                    .body(Body::from("close\n1\n2\n"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(accepted.status(), StatusCode::OK);

        let json = body_json(accepted).await;
        assert_eq!(json["data"]["name"], "prices.csv");
        assert!(dir.path().join("uploads/prices.csv").exists());
    }
}
