use std::sync::Arc;

use tracing::warn;

use crate::application::interfaces::vector_store::{ScoredPoint, VectorPayload, VectorPoint};
use crate::application::interfaces::{Embedder, VectorStore};
use crate::domain::error::DomainError;
use crate::domain::models::Chunk;

const DEFAULT_BATCH_SIZE: usize = 32;
const SLIDING_WINDOW_TOKENS: usize = 2000;
const SLIDING_WINDOW_OVERLAP_RATIO: f64 = 0.2;
/// Below this byte size a file is chunked by section instead of sliding
/// window — short files don't benefit from overlap and it would only
/// duplicate nearly the whole file across chunks.
const SECTION_CHUNKING_THRESHOLD_BYTES: usize = 4096;

/// Chunks files, embeds them, and upserts into the vector store (spec
/// §4.G). Degrades to lexical-only, non-fatally, whenever the embedder or
/// vector store is unavailable — this is a first-class correctness mode.
pub struct SemanticIndexer {
    embedder: Arc<dyn Embedder>,
    vector_store: Arc<dyn VectorStore>,
    batch_size: usize,
}

impl SemanticIndexer {
    pub fn new(embedder: Arc<dyn Embedder>, vector_store: Arc<dyn VectorStore>) -> Self {
        Self {
            embedder,
            vector_store,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub async fn index_file(
        &self,
        repo_id: &str,
        relative_path: &str,
        content_hash: &str,
        content: &[u8],
    ) -> Result<(), DomainError> {
        let text = String::from_utf8_lossy(content);
        let chunks = chunk_text(&text);
        if chunks.is_empty() {
            return Ok(());
        }

        let language = crate::domain::models::Language::from_extension(
            relative_path.rsplit('.').next().unwrap_or(""),
        )
        .unwrap_or(crate::domain::models::Language::Unknown);

        let mut points = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = match self.embedder.embed(texts).await {
                Ok(v) => v,
                Err(e) => {
                    warn!(repo_id, relative_path, error = %e, "embedding failed, file stays lexical-only");
                    return Ok(());
                }
            };
            for (chunk, vector) in batch.iter().zip(vectors.into_iter()) {
                let id = Chunk::derive_id(relative_path, "chunk", chunk.byte_start as u32, content_hash);
                points.push(VectorPoint {
                    id,
                    vector,
                    payload: VectorPayload {
                        relative_path: relative_path.to_string(),
                        content_hash: content_hash.to_string(),
                        repo_id: repo_id.to_string(),
                        symbol: None,
                        kind: None,
                        line: chunk.line,
                        span: (chunk.byte_start as u32, chunk.byte_end as u32),
                        language: language.id().to_string(),
                        context_before: chunk.context_before.clone(),
                        context_after: chunk.context_after.clone(),
                    },
                });
            }
        }

        match self.vector_store.upsert(points).await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(repo_id, relative_path, error = %e, "vector upsert failed, file stays lexical-only");
                Ok(())
            }
        }
    }

    pub async fn remove_file(&self, repo_id: &str, relative_path: &str) -> Result<(), DomainError> {
        match self.vector_store.remove_by_path(repo_id, relative_path).await {
            Ok(()) => Ok(()),
            Err(DomainError::VectorStoreUnavailable(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Updates vector payloads in place for a moved-unchanged file — never
    /// re-embeds (spec property 6).
    pub async fn move_file(
        &self,
        repo_id: &str,
        old_relative_path: &str,
        new_relative_path: &str,
        _new_content_hash: &str,
    ) -> Result<(), DomainError> {
        match self.vector_store.move_path(repo_id, old_relative_path, new_relative_path).await {
            Ok(()) => Ok(()),
            Err(DomainError::VectorStoreUnavailable(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub async fn search(
        &self,
        repo_id: &str,
        query: &str,
        k: usize,
    ) -> Result<Vec<ScoredPoint>, DomainError> {
        let vector = self
            .embedder
            .embed(vec![query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::internal("embedder returned empty batch"))?;
        self.vector_store.search(repo_id, vector, k).await
    }
}

struct TextChunk {
    text: String,
    byte_start: usize,
    byte_end: usize,
    line: u32,
    context_before: Option<String>,
    context_after: Option<String>,
}

/// Adaptive chunking: small files get one section-sized chunk, larger files
/// get an overlapping sliding window (spec §4.G).
fn chunk_text(text: &str) -> Vec<TextChunk> {
    if text.is_empty() {
        return Vec::new();
    }
    if text.len() <= SECTION_CHUNKING_THRESHOLD_BYTES {
        return vec![TextChunk {
            text: text.to_string(),
            byte_start: 0,
            byte_end: text.len(),
            line: 1,
            context_before: None,
            context_after: None,
        }];
    }

    // Approximate tokens as whitespace-separated words; good enough for a
    // window-sizing heuristic, not a tokenizer.
    let words: Vec<(usize, &str)> = text.split_whitespace().map(|w| (word_offset(text, w), w)).collect();
    let step = ((SLIDING_WINDOW_TOKENS as f64) * (1.0 - SLIDING_WINDOW_OVERLAP_RATIO)).max(1.0) as usize;

    let mut chunks = Vec::new();
    let mut start_idx = 0usize;
    while start_idx < words.len() {
        let end_idx = (start_idx + SLIDING_WINDOW_TOKENS).min(words.len());
        let byte_start = words[start_idx].0;
        let byte_end = if end_idx < words.len() {
            words[end_idx].0
        } else {
            text.len()
        };
        let line = text[..byte_start].matches('\n').count() as u32 + 1;
        chunks.push(TextChunk {
            text: text[byte_start..byte_end].to_string(),
            byte_start,
            byte_end,
            line,
            context_before: None,
            context_after: None,
        });
        if end_idx >= words.len() {
            break;
        }
        start_idx += step;
    }
    chunks
}

fn word_offset(haystack: &str, needle: &str) -> usize {
    needle.as_ptr() as usize - haystack.as_ptr() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = chunk_text("def f(): return 1");
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn empty_text_has_no_chunks() {
        assert!(chunk_text("").is_empty());
    }
}
