//! Financial theory library: ingestion and semantic retrieval

pub mod embeddings;
pub mod ingest;
pub mod store;

pub use embeddings::{Embedder, OllamaEmbeddings};
pub use ingest::{ingest_documents, IngestReport, TextSplitter};
pub use store::{ChunkStore, ScoredChunk, StoredChunk};

use crate::translate::{to_english, Translator};
use crate::Result;
use std::sync::Arc;
use tracing::{debug, info};

pub const NOTHING_FOUND: &str = "No relevant information found in the documents.";

pub struct KnowledgeRetriever {
    store: ChunkStore,
    embedder: Arc<dyn Embedder>,
    translator: Arc<dyn Translator>,
}

impl KnowledgeRetriever {
    pub fn new(store: ChunkStore, embedder: Arc<dyn Embedder>, translator: Arc<dyn Translator>) -> Self {
        Self {
            store,
            embedder,
            translator,
        }
    }

    /// Evidence blocks for the `top_k` chunks closest to `query`.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<String> {
        if self.store.count().await? == 0 {
            return Ok(NOTHING_FOUND.to_string());
        }

        let english = to_english(self.translator.as_ref(), query).await;
        let vector = self.embedder.embed(&english).await?;
        let hits = self.store.nearest(&vector, top_k).await?;

        info!(query = %english, hits = hits.len(), "Knowledge base searched");
        if hits.is_empty() {
            return Ok(NOTHING_FOUND.to_string());
        }

        debug!(best_score = hits[0].score, "Top evidence score");
        Ok(format_evidence(&hits))
    }
}

pub fn format_evidence(hits: &[ScoredChunk]) -> String {
    hits.iter()
        .enumerate()
        .map(|(i, hit)| {
            format!(
                "--- EVIDENCE {} (Source: {}, Page: {}) ---\n{}",
                i + 1,
                hit.source,
                hit.page,
                hit.document
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
