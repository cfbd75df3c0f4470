//! Batched embedding with rate-limit backoff and partial-failure accounting.

use crate::embedding::{EmbeddingClient, EmbeddingClientError};
use crate::store::{ChunkRecord, DocumentStore, StoreError};
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Chunks embedded per concurrent group.
pub const GROUP_SIZE: usize = 5;
/// Pause between consecutive embedding groups.
pub const GROUP_PAUSE: Duration = Duration::from_millis(1000);
/// Retries granted to a single chunk after a rate-limit response.
pub const MAX_RETRIES: u32 = 3;
/// Base unit for the linear backoff delay.
pub const BACKOFF_STEP: Duration = Duration::from_millis(2000);
/// Longest text (characters) sent to the embedding provider.
pub const EMBED_CHAR_LIMIT: usize = 8000;
/// Longest chunk text (characters) written to the store.
pub const STORED_CHAR_LIMIT: usize = 5000;

/// Tuning knobs for the embedding batcher.
#[derive(Debug, Clone)]
pub struct BatcherConfig {
    /// Chunks embedded per concurrent group.
    pub group_size: usize,
    /// Pause inserted before every group after the first.
    pub group_pause: Duration,
    /// Retries granted per chunk on rate-limit responses.
    pub max_retries: u32,
    /// Backoff unit; the nth retry waits n times this.
    pub backoff_step: Duration,
    /// Character cap applied before sending text to the provider.
    pub embed_char_limit: usize,
    /// Character cap applied before persisting chunk text.
    pub stored_char_limit: usize,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            group_size: GROUP_SIZE,
            group_pause: GROUP_PAUSE,
            max_retries: MAX_RETRIES,
            backoff_step: BACKOFF_STEP,
            embed_char_limit: EMBED_CHAR_LIMIT,
            stored_char_limit: STORED_CHAR_LIMIT,
        }
    }
}

/// A chunk awaiting embedding and persistence.
#[derive(Debug, Clone)]
pub struct PendingChunk {
    /// Position within the document.
    pub chunk_index: u32,
    /// Chunk text as produced by the chunker.
    pub text: String,
    /// Page the chunk came from.
    pub page_number: u32,
    /// Document-level language code.
    pub language: String,
}

/// A chunk that failed to embed and was excluded from persistence.
#[derive(Debug)]
pub struct DroppedChunk {
    /// Position of the failed chunk.
    pub chunk_index: u32,
    /// The error that caused the drop.
    pub error: EmbeddingError,
}

/// Result of embedding and persisting a document's chunks.
///
/// Partial failure is explicit: callers see how many chunks were stored and
/// which ones were dropped rather than inferring it from counts.
#[derive(Debug)]
pub struct BatchOutcome {
    /// Number of chunk records written to the store.
    pub persisted: usize,
    /// Chunks whose embedding failed after retries.
    pub dropped: Vec<DroppedChunk>,
}

/// Errors raised while embedding and persisting chunks.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Text was empty or whitespace after trimming.
    #[error("cannot embed empty text")]
    EmptyInput,
    /// Provider-side failure.
    #[error(transparent)]
    Provider(#[from] EmbeddingClientError),
    /// Every chunk in the batch failed to embed.
    #[error("no chunks produced a valid embedding")]
    NoValidEmbeddings,
    /// Persistence failure after embedding succeeded.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Embeds chunk texts in rate-limited groups and bulk-persists the results.
pub struct EmbeddingBatcher {
    client: Arc<dyn EmbeddingClient>,
    store: Arc<dyn DocumentStore>,
    config: BatcherConfig,
}

impl EmbeddingBatcher {
    /// Build a batcher over an embedding client and a store.
    pub fn new(
        client: Arc<dyn EmbeddingClient>,
        store: Arc<dyn DocumentStore>,
        config: BatcherConfig,
    ) -> Self {
        Self {
            client,
            store,
            config,
        }
    }

    /// Embed a single text, retrying rate-limit responses with a linearly
    /// growing delay. Non-rate-limit errors are terminal on first occurrence.
    pub async fn embed_single(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }
        let input = truncate_chars(trimmed, self.config.embed_char_limit);

        let mut attempts_used: u32 = 0;
        loop {
            match self.client.embed(&input).await {
                Ok(vector) => return Ok(vector),
                Err(EmbeddingClientError::RateLimited)
                    if attempts_used < self.config.max_retries =>
                {
                    attempts_used += 1;
                    let delay = self.config.backoff_step * attempts_used;
                    tracing::warn!(
                        attempt = attempts_used,
                        delay_ms = delay.as_millis() as u64,
                        "Embedding rate limited, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(error) => return Err(error.into()),
            }
        }
    }

    /// Embed every chunk in fixed-size groups and bulk-insert the successes.
    ///
    /// Chunks that fail to embed after retries, and chunks whose text is
    /// empty, are dropped and reported in the outcome; the run only fails
    /// outright when no chunk embedded or the bulk insert itself failed.
    pub async fn embed_and_persist(
        &self,
        document_id: Uuid,
        chunks: Vec<PendingChunk>,
    ) -> Result<BatchOutcome, EmbeddingError> {
        let mut records = Vec::with_capacity(chunks.len());
        let mut dropped = Vec::new();

        for (group_number, group) in chunks.chunks(self.config.group_size).enumerate() {
            if group_number > 0 {
                tokio::time::sleep(self.config.group_pause).await;
            }

            let embeddings =
                join_all(group.iter().map(|chunk| self.embed_single(&chunk.text))).await;

            for (chunk, result) in group.iter().zip(embeddings) {
                match result {
                    Ok(embedding) => records.push(ChunkRecord {
                        document_id,
                        chunk_index: chunk.chunk_index,
                        chunk_text: truncate_chars(&chunk.text, self.config.stored_char_limit),
                        page_number: chunk.page_number,
                        language: chunk.language.clone(),
                        embedding,
                    }),
                    Err(
                        error @ (EmbeddingError::EmptyInput | EmbeddingError::Provider(_)),
                    ) => {
                        tracing::warn!(
                            %document_id,
                            chunk_index = chunk.chunk_index,
                            error = %error,
                            "Dropping chunk after embedding failure"
                        );
                        dropped.push(DroppedChunk {
                            chunk_index: chunk.chunk_index,
                            error,
                        });
                    }
                    Err(error) => return Err(error),
                }
            }
        }

        if records.is_empty() {
            return Err(EmbeddingError::NoValidEmbeddings);
        }

        self.store.insert_chunks(&records).await?;
        Ok(BatchOutcome {
            persisted: records.len(),
            dropped,
        })
    }
}

/// Truncate on a character boundary, never mid-codepoint.
fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        text.to_string()
    } else {
        text.chars().take(limit).collect()
    }
}
