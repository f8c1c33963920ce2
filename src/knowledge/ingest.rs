//! Document ingestion: clean, split, embed, store
//!
//! `.pdf` files are read page by page with `lopdf`. Any other file is taken
//! as a plain-text page dump with pages separated by form feeds, the layout
//! `pdftotext` produces.

use crate::error::AgentError;
use crate::knowledge::embeddings::Embedder;
use crate::knowledge::store::{ChunkStore, StoredChunk};
use crate::Result;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const PAGE_BREAK: char = '\x0c';
const MIN_PAGE_WORDS: usize = 30;

lazy_static! {
    static ref MIRRORED_LINE: Regex = Regex::new(r"\b(eht|dna|fo|si)\b").unwrap();
    static ref BOILERPLATE_PAGE: Regex =
        Regex::new(r"(?i)table of contents|copyright|index|acknowledg").unwrap();
    static ref PAGE_MARKER: Regex = Regex::new(r"-+\s*PAGE\s+\d+\s*-+").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Reverse lines that read as mirrored English ("eht" for "the", ...).
pub fn repair_reversed_text(text: &str) -> String {
    text.split('\n')
        .map(|line| {
            if MIRRORED_LINE.is_match(line) {
                line.chars().rev().collect()
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<String>>()
        .join("\n")
}

/// Normalized page text, or `None` for boilerplate and near-empty pages.
pub fn clean_text(raw: &str) -> Option<String> {
    let text = repair_reversed_text(raw);

    if BOILERPLATE_PAGE.is_match(&text) {
        return None;
    }
    if text.split_whitespace().count() < MIN_PAGE_WORDS {
        return None;
    }

    let text = PAGE_MARKER.replace_all(&text, "");
    let text = WHITESPACE.replace_all(&text, " ");
    let text = text.trim();

    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub source: String,
    pub page: u32,
    pub text: String,
}

/// Cleaned pages of one document; dropped pages keep their numbering.
pub fn pages_from_text(source: &str, content: &str) -> Vec<Page> {
    content
        .split(PAGE_BREAK)
        .enumerate()
        .filter_map(|(index, raw)| {
            clean_text(raw).map(|text| Page {
                source: source.to_string(),
                page: index as u32 + 1,
                text,
            })
        })
        .collect()
}

/// Cleaned pages of a PDF, numbered as in the document. Pages whose text
/// cannot be extracted are skipped.
pub fn pages_from_pdf(source: &str, bytes: &[u8]) -> Result<Vec<Page>> {
    let document = lopdf::Document::load_mem(bytes)
        .map_err(|e| AgentError::IngestionError(format!("{}: {}", source, e)))?;

    let mut pages = Vec::new();
    for page_number in document.get_pages().into_keys() {
        let raw = match document.extract_text(&[page_number]) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(source = %source, page = page_number, error = %e, "Skipping unreadable page");
                continue;
            }
        };

        if let Some(text) = clean_text(&raw) {
            pages.push(Page {
                source: source.to_string(),
                page: page_number,
                text,
            });
        }
    }

    Ok(pages)
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/// Cleaned pages of one input file, PDF or text dump.
pub async fn load_pages(path: &Path) -> Result<Vec<Page>> {
    let source = source_name(path);

    if is_pdf(path) {
        let bytes = tokio::fs::read(path).await?;
        return tokio::task::spawn_blocking(move || pages_from_pdf(&source, &bytes))
            .await
            .map_err(|e| AgentError::IngestionError(format!("PDF extraction task failed: {}", e)))?;
    }

    let content = tokio::fs::read_to_string(path).await?;
    Ok(pages_from_text(&source, &content))
}

/// Recursive character splitter
///
/// Tries each separator in turn, keeps the separator at the start of the
/// following piece, and merges pieces back into windows of at most
/// `chunk_size` characters that overlap by up to `chunk_overlap`.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_overlap > chunk_size {
            return Err(AgentError::ConfigError(format!(
                "chunk overlap ({}) is larger than chunk size ({})",
                chunk_overlap, chunk_size
            )));
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators: ["\n\n", "\n", ".", " ", ""]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        })
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut separator = separators.last().map(String::as_str).unwrap_or("");
        let mut remaining: &[String] = &[];

        for (i, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = "";
                break;
            }
            if text.contains(candidate.as_str()) {
                separator = candidate;
                remaining = &separators[i + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut short_pieces: Vec<&str> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                short_pieces.push(piece);
                continue;
            }

            if !short_pieces.is_empty() {
                chunks.extend(self.merge(&short_pieces));
                short_pieces.clear();
            }

            if remaining.is_empty() {
                chunks.push(piece.to_string());
            } else {
                chunks.extend(self.split_recursive(piece, remaining));
            }
        }

        if !short_pieces.is_empty() {
            chunks.extend(self.merge(&short_pieces));
        }

        chunks
    }

    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0;

        for piece in pieces {
            let len = char_len(piece);

            if total + len > self.chunk_size && !window.is_empty() {
                push_joined(&mut chunks, &window);

                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    match window.pop_front() {
                        Some(front) => total -= char_len(front),
                        None => break,
                    }
                }
            }

            window.push_back(piece);
            total += len;
        }

        push_joined(&mut chunks, &window);
        chunks
    }
}

fn push_joined(chunks: &mut Vec<String>, window: &VecDeque<&str>) {
    let joined: String = window.iter().copied().collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Split on `separator`, attaching each separator to the piece after it.
/// An empty separator splits into characters.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (index, _) in text.match_indices(separator) {
        pieces.push(&text[start..index]);
        start = index;
    }
    pieces.push(&text[start..]);

    pieces.into_iter().filter(|p| !p.is_empty()).collect()
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub documents: usize,
    pub pages: usize,
    pub chunks: usize,
}

/// Rebuild the store from `paths`. Unreadable files are skipped with a warning.
pub async fn ingest_documents(
    paths: &[PathBuf],
    store: &ChunkStore,
    embedder: &dyn Embedder,
    splitter: &TextSplitter,
    batch_size: usize,
) -> Result<IngestReport> {
    let batch_size = batch_size.max(1);
    store.reset().await?;

    let mut report = IngestReport::default();
    let mut pending: Vec<(String, Page)> = Vec::new();

    for path in paths {
        let pages = match load_pages(path).await {
            Ok(pages) => pages,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable document");
                continue;
            }
        };
        info!(path = %path.display(), pages = pages.len(), "Document cleaned");

        report.documents += 1;
        report.pages += pages.len();

        for page in pages {
            for chunk in splitter.split_text(&page.text) {
                pending.push((chunk, page.clone()));
            }
        }
    }

    if pending.is_empty() {
        warn!("No usable text found, store left empty");
        return Ok(report);
    }

    let total_batches = pending.len().div_ceil(batch_size);
    info!(chunks = pending.len(), "Embedding chunks");

    for (batch_index, batch) in pending.chunks(batch_size).enumerate() {
        let mut rows = Vec::with_capacity(batch.len());

        for (offset, (text, page)) in batch.iter().enumerate() {
            rows.push(StoredChunk {
                id: format!("id_{}", batch_index * batch_size + offset),
                document: text.clone(),
                source: page.source.clone(),
                page: page.page,
                embedding: embedder.embed(text).await?,
            });
        }

        store.add_batch(&rows).await?;
        report.chunks += rows.len();
        info!(batch = batch_index + 1, total = total_batches, "Batch stored");
    }

    Ok(report)
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
