use financial_research_agent::{
    api::start_server, config::AppConfig, conversational::ConversationService,
    memory::SessionStore, FinancialAgent,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env()?;

    info!("Financial Research Agent - API Server");
    info!("Port: {}", config.api_port);

    // Create components
    let agent = Arc::new(FinancialAgent::from_config(&config).await?);
    let sessions = Arc::new(SessionStore::open(&config.history_file).await?);
    tokio::fs::create_dir_all(&config.upload_dir).await?;

    let service = Arc::new(ConversationService::new(
        agent,
        sessions,
        config.upload_dir.clone(),
    ));

    info!("Conversation service initialized");

    // Start API server
    start_server(service, config.api_port).await?;

    Ok(())
}
