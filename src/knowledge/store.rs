//! SQLite chunk store
//!
//! Embeddings are kept as JSON text; similarity is computed in Rust after a
//! full scan, which is fine for a single-library corpus.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub struct StoredChunk {
    pub id: String,
    pub document: String,
    pub source: String,
    pub page: u32,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub document: String,
    pub source: String,
    pub page: u32,
    pub score: f32,
}

#[derive(Clone)]
pub struct ChunkStore {
    pool: SqlitePool,
}

impl ChunkStore {
    /// Open (or create) the store at `path`.
    pub async fn open(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.ensure_schema().await?;
        info!(path = %path.display(), "Chunk store opened");
        Ok(store)
    }

    /// Private in-memory store. A single connection keeps every query on the
    /// same database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
              id TEXT PRIMARY KEY,
              document TEXT NOT NULL,
              source TEXT NOT NULL,
              page INTEGER NOT NULL,
              embedding TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn reset(&self) -> Result<()> {
        sqlx::query("DELETE FROM chunks").execute(&self.pool).await?;
        info!("Chunk store cleared");
        Ok(())
    }

    pub async fn add_batch(&self, chunks: &[StoredChunk]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for chunk in chunks {
            let embedding = serde_json::to_string(&chunk.embedding)?;
            sqlx::query(
                "INSERT OR REPLACE INTO chunks (id, document, source, page, embedding) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&chunk.id)
            .bind(&chunk.document)
            .bind(&chunk.source)
            .bind(i64::from(chunk.page))
            .bind(embedding)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(count = chunks.len(), "Chunk batch written");
        Ok(())
    }

    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// The `top_k` chunks most similar to `query`, best first.
    pub async fn nearest(&self, query: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>> {
        let rows = sqlx::query("SELECT document, source, page, embedding FROM chunks")
            .fetch_all(&self.pool)
            .await?;

        let mut scored = Vec::with_capacity(rows.len());
        for row in rows {
            let embedding: String = row.try_get("embedding")?;
            let vector: Vec<f32> = serde_json::from_str(&embedding)?;
            let page: i64 = row.try_get("page")?;

            scored.push(ScoredChunk {
                document: row.try_get("document")?,
                source: row.try_get("source")?,
                page: u32::try_from(page).unwrap_or(0),
                score: cosine_similarity(query, &vector),
            });
        }

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);

        Ok(scored)
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}
