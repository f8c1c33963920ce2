use clap::Parser;
use financial_research_agent::{
    config::AppConfig,
    knowledge::{ingest_documents, ChunkStore, OllamaEmbeddings, TextSplitter},
};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Build the knowledge base from PDFs or text page dumps (pages split by form feed).
#[derive(Parser, Debug)]
#[command(name = "ingest", version, about)]
struct Args {
    /// Documents to ingest (`.pdf` or text)
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Chunk store location
    #[arg(long, env = "KNOWLEDGE_DB_PATH")]
    db: Option<PathBuf>,

    /// Chunk size in characters
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Overlap between consecutive chunks in characters
    #[arg(long)]
    chunk_overlap: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = AppConfig::from_env()?;

    let db_path = args.db.unwrap_or_else(|| config.knowledge_db_path.clone());
    let splitter = TextSplitter::new(
        args.chunk_size.unwrap_or(config.chunk_size),
        args.chunk_overlap.unwrap_or(config.chunk_overlap),
    )?;

    info!(db = %db_path.display(), files = args.files.len(), model = %config.embed_model, "Ingesting documents");

    let store = ChunkStore::open(&db_path).await?;
    let embedder = OllamaEmbeddings::new(config.ollama_base_url.clone(), config.embed_model.clone())?;

    let report = ingest_documents(
        &args.files,
        &store,
        &embedder,
        &splitter,
        config.ingest_batch_size,
    )
    .await?;

    if report.chunks == 0 {
        warn!("No chunks were stored");
    }

    println!(
        "Ingested {} document(s), {} page(s), {} chunk(s) into {}",
        report.documents,
        report.pages,
        report.chunks,
        db_path.display()
    );

    Ok(())
}
