//! Similarity search over persisted chunks.
//!
//! Queries are embedded with the same model as the stored chunks and ranked
//! by the database-side vector function. When that function is missing the
//! service falls back to fetching the candidate chunks and ranking them in
//! process by cosine similarity.

use crate::pipeline::batcher::{EmbeddingBatcher, EmbeddingError};
use crate::store::{DocumentStore, StoreError};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Results returned when the caller does not specify a limit.
pub const DEFAULT_TOP_K: usize = 5;

/// Errors raised while searching.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Query and chunk vectors disagree on dimensionality.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension of the query vector.
        expected: usize,
        /// Dimension of the stored vector.
        actual: usize,
    },
    /// Embedding the query failed.
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
    /// Persistence-layer failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A ranked search result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    /// Chunk id.
    pub chunk_id: Uuid,
    /// Owning document.
    pub document_id: Uuid,
    /// Stored chunk text.
    pub text: String,
    /// Page the chunk came from.
    pub page_number: u32,
    /// Cosine similarity to the query, descending in result order.
    pub similarity: f32,
    /// Stored language code.
    pub language: String,
}

/// Embeds queries and ranks chunks of the candidate documents.
pub struct SearchService {
    batcher: Arc<EmbeddingBatcher>,
    store: Arc<dyn DocumentStore>,
}

impl SearchService {
    /// Build a search service sharing the pipeline's embedding path.
    pub fn new(batcher: Arc<EmbeddingBatcher>, store: Arc<dyn DocumentStore>) -> Self {
        Self { batcher, store }
    }

    /// Return the `top_k` most similar chunks among the candidate documents.
    pub async fn search(
        &self,
        query: &str,
        document_ids: &[Uuid],
        top_k: Option<usize>,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let top_k = top_k.unwrap_or(DEFAULT_TOP_K);
        let query_embedding = self.batcher.embed_single(query).await?;

        match self
            .store
            .rank_chunks(&query_embedding, document_ids, top_k)
            .await
        {
            Ok(ranked) => Ok(ranked
                .into_iter()
                .map(|chunk| SearchHit {
                    chunk_id: chunk.id,
                    document_id: chunk.document_id,
                    text: chunk.chunk_text,
                    page_number: chunk.page_number,
                    similarity: chunk.similarity,
                    language: chunk.language,
                })
                .collect()),
            Err(StoreError::RankingUnavailable) => {
                tracing::warn!("Vector ranking unavailable, falling back to in-process cosine");
                self.rank_in_process(&query_embedding, document_ids, top_k)
                    .await
            }
            Err(error) => Err(error.into()),
        }
    }

    async fn rank_in_process(
        &self,
        query_embedding: &[f32],
        document_ids: &[Uuid],
        top_k: usize,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let chunks = self.store.fetch_embedded_chunks(document_ids).await?;

        let mut hits = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let similarity = cosine_similarity(query_embedding, &chunk.embedding)?;
            hits.push(SearchHit {
                chunk_id: chunk.id,
                document_id: chunk.document_id,
                text: chunk.chunk_text,
                page_number: chunk.page_number,
                similarity,
                language: chunk.language,
            });
        }

        hits.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        hits.truncate(top_k);
        Ok(hits)
    }
}

/// Cosine similarity of two vectors. Returns 0.0 when either has zero
/// magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, SearchError> {
    if a.len() != b.len() {
        return Err(SearchError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let magnitude = norm_a.sqrt() * norm_b.sqrt();
    if magnitude == 0.0 {
        return Ok(0.0);
    }
    Ok(dot / magnitude)
}
