use axum::body::Body;
use axum::http::{Request, StatusCode};
use financial_research_agent::agent::{FinancialAgent, ReportSettings, TURN_LIMIT_MESSAGE};
use financial_research_agent::api::create_router;
use financial_research_agent::conversational::ConversationService;
use financial_research_agent::llm::MockModel;
use financial_research_agent::memory::SessionStore;
use financial_research_agent::tools::{AnalyzeFullCsvTool, ReadCsvPreviewTool, ToolRegistry};
use financial_research_agent::RunStatus;
use std::io::Write;
use std::sync::Arc;
use tower::ServiceExt;

fn csv_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(ReadCsvPreviewTool));
    registry.register(Arc::new(AnalyzeFullCsvTool));
    registry
}

fn price_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    writeln!(file, "date,close,volume").unwrap();
    writeln!(file, "2024-01-01,100,10").unwrap();
    writeln!(file, "2024-01-02,105,12").unwrap();
    writeln!(file, "2024-01-03,110,14").unwrap();
    file
}

#[tokio::test]
async fn csv_question_runs_tool_and_synthesizes_report() {
    let file = price_file();
    let path = file.path().display().to_string();

    let model = Arc::new(MockModel::new(vec![
        format!(
            "Thought: The user uploaded a file, I should analyze it.\nAction: analyze_full_csv\nAction Input: '{}'",
            path
        ),
        "Thought: Close rose 10%.\nFinal Answer: Close rose from 100 to 110 (+10%).".to_string(),
        "Kapanış fiyatı %10 yükseldi. Yatırım Tavsiyesi Değildir (YTD)".to_string(),
    ]));

    let agent = FinancialAgent::new(model.clone(), csv_registry(), ReportSettings::default(), 7);
    let run = agent.run("Dosyayı yorumla").await.unwrap();

    assert_eq!(run.status, RunStatus::Answered);
    assert_eq!(run.turns_used, 2);
    assert!(run.answer.contains("YTD"));

    let observation = run.transcript.turns()[0].observation.clone().unwrap();
    assert!(observation.contains("Total Change: 10.00% (UPTREND)"));
    assert!(observation.contains("CORRELATION MATRIX"));

    let report_request = &model.requests()[2];
    let collected = &report_request.messages[1].content;
    assert!(collected.contains("[Step 1]\nCall: analyze_full_csv("));
    assert!(collected.ends_with("[Result]: Close rose from 100 to 110 (+10%)."));

    let trace = run.render_trace();
    assert!(trace.starts_with("[User]: Dosyayı yorumla"));
    assert!(trace.contains("[Action]: analyze_full_csv -> "));
}

#[tokio::test]
async fn turn_budget_ends_the_run_without_extra_calls() {
    let replies: Vec<String> = (0..10).map(|i| format!("Thought: still thinking {}", i)).collect();
    let model = Arc::new(MockModel::new(replies));

    let agent = FinancialAgent::new(model.clone(), csv_registry(), ReportSettings::default(), 7);
    let run = agent.run("?").await.unwrap();

    assert_eq!(run.answer, TURN_LIMIT_MESSAGE);
    assert_eq!(run.status, RunStatus::TurnLimitReached);
    assert_eq!(model.call_count(), 7);
}

#[tokio::test]
async fn chat_endpoint_persists_session() {
    let dir = tempfile::tempdir().unwrap();
    let history = dir.path().join("chat_history.json");

    let model = Arc::new(MockModel::new([
        "Action: read_csv_preview\nAction Input: missing.csv",
        "Final Answer: The file could not be found.",
        "Dosya bulunamadı. Veriye ulaşılamadı.",
    ]));
    let agent = FinancialAgent::new(model, csv_registry(), ReportSettings::default(), 7);
    let sessions = Arc::new(SessionStore::open(&history).await.unwrap());
    let service = ConversationService::new(Arc::new(agent), sessions, dir.path().join("uploads"));
    let app = create_router(Arc::new(service));

    let response = app
        .clone()
        .oneshot(
            Request::post("/api/chat")
                .header("content-type", "application/json")
                .body(Body::from(
                    r#"{"session_id":"sidebar-chat-1","message":"missing.csv dosyasına bak"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["answer"], "Dosya bulunamadı. Veriye ulaşılamadı.");
    assert!(json["data"]["thoughts"]
        .as_str()
        .unwrap()
        .contains("[Observation]: ERROR: 'missing.csv' not found."));

    let list = app
        .oneshot(Request::get("/api/sessions").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let bytes = axum::body::to_bytes(list.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["data"][0]["title"], "missing.csv dosyasın...");
    assert_eq!(json["data"][0]["message_count"], 2);

    let raw = std::fs::read_to_string(&history).unwrap();
    assert!(raw.contains("Veriye ulaşılamadı"));
}
