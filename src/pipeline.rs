//! Document processing pipeline.
//!
//! A run fetches the uploaded bytes, extracts paginated text, chunks each
//! page, embeds the chunks in rate-limited groups, and bulk-persists the
//! results. The document row records the outcome: `processing` at the start,
//! then `completed` or `failed`. Run errors never propagate past the status
//! write; callers of [`DocumentPipeline::run`] get fire-and-report semantics.

pub mod batcher;
pub mod queue;

pub use batcher::{BatchOutcome, EmbeddingBatcher, EmbeddingError, PendingChunk};
pub use queue::{JobQueue, JobRunner, QueueError};

use crate::chunking;
use crate::extract::{ExtractionError, Extractor};
use crate::language::detect_language;
use crate::metrics::PipelineMetrics;
use crate::storage::{BlobFetcher, StorageFetchError};
use crate::store::{DocumentStore, StatusUpdate, StoreError};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// A processing job for one uploaded document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRequest {
    /// Document row id.
    pub document_id: Uuid,
    /// Location of the uploaded bytes.
    pub storage_url: String,
    /// Declared MIME type, recorded for diagnostics.
    pub mime_type: String,
    /// Declared file type name resolved by the extractor.
    pub file_type: String,
}

/// Errors that fail a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Fetching the uploaded bytes failed.
    #[error(transparent)]
    Fetch(#[from] StorageFetchError),
    /// Text extraction failed.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    /// Extraction succeeded but yielded no pages.
    #[error("no pages extracted from document")]
    NoPages,
    /// Chunking yielded nothing above the minimum chunk size.
    #[error("no chunks produced from document text")]
    NoChunks,
    /// Embedding or persistence of chunks failed.
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
    /// A document status write failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Summary of a successful run.
#[derive(Debug)]
pub struct PipelineReport {
    /// Reported page count written to the document row.
    pub total_pages: u32,
    /// Chunk records persisted.
    pub persisted: usize,
    /// Chunks dropped after embedding failures.
    pub dropped: usize,
}

/// End-to-end processing of one document.
pub struct DocumentPipeline {
    fetcher: BlobFetcher,
    extractor: Extractor,
    store: Arc<dyn DocumentStore>,
    batcher: EmbeddingBatcher,
    metrics: Arc<PipelineMetrics>,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl DocumentPipeline {
    /// Assemble a pipeline from its stages.
    pub fn new(
        fetcher: BlobFetcher,
        extractor: Extractor,
        store: Arc<dyn DocumentStore>,
        batcher: EmbeddingBatcher,
        metrics: Arc<PipelineMetrics>,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            store,
            batcher,
            metrics,
            chunk_size,
            chunk_overlap,
        }
    }

    /// Process a document and record the outcome on its row.
    ///
    /// Both status writes and the run itself are best-effort from the
    /// caller's perspective; errors are logged and recorded, never returned.
    pub async fn run(&self, job: ProcessRequest) {
        let document_id = job.document_id;
        tracing::info!(%document_id, file_type = %job.file_type, "Processing document");

        if let Err(error) = self
            .store
            .update_document_status(document_id, StatusUpdate::processing())
            .await
        {
            tracing::error!(%document_id, error = %error, "Failed to mark document processing");
            return;
        }

        match self.execute(&job).await {
            Ok(report) => {
                self.metrics.record_completed(report.persisted as u64);
                tracing::info!(
                    %document_id,
                    total_pages = report.total_pages,
                    persisted = report.persisted,
                    dropped = report.dropped,
                    "Document processed"
                );
                if let Err(error) = self
                    .store
                    .update_document_status(document_id, StatusUpdate::completed(report.total_pages))
                    .await
                {
                    tracing::error!(%document_id, error = %error, "Failed to mark document completed");
                }
            }
            Err(error) => {
                self.metrics.record_failed();
                tracing::error!(%document_id, error = %error, "Document processing failed");
                if let Err(write_error) = self
                    .store
                    .update_document_status(document_id, StatusUpdate::failed(error.to_string()))
                    .await
                {
                    tracing::error!(%document_id, error = %write_error, "Failed to mark document failed");
                }
            }
        }
    }

    async fn execute(&self, job: &ProcessRequest) -> Result<PipelineReport, PipelineError> {
        let bytes = self.fetcher.fetch(&job.storage_url).await?;
        let extraction = self.extractor.extract(bytes, &job.file_type).await?;
        if extraction.pages.is_empty() {
            return Err(PipelineError::NoPages);
        }

        // One language tag per document, detected on the full text.
        let language = detect_language(&extraction.full_text);

        let mut chunks = Vec::new();
        let mut chunk_index: u32 = 0;
        for page in &extraction.pages {
            if page.text.trim().is_empty() {
                tracing::warn!(
                    document_id = %job.document_id,
                    page = page.number,
                    "Skipping blank page"
                );
                continue;
            }
            for text in chunking::chunk_text(&page.text, self.chunk_size, self.chunk_overlap) {
                chunks.push(PendingChunk {
                    chunk_index,
                    text,
                    page_number: page.number,
                    language: language.to_string(),
                });
                chunk_index += 1;
            }
        }
        if chunks.is_empty() {
            return Err(PipelineError::NoChunks);
        }

        let outcome = self
            .batcher
            .embed_and_persist(job.document_id, chunks)
            .await?;

        Ok(PipelineReport {
            total_pages: extraction.total_pages,
            persisted: outcome.persisted,
            dropped: outcome.dropped.len(),
        })
    }

}

#[async_trait]
impl JobRunner for DocumentPipeline {
    async fn run(&self, job: ProcessRequest) {
        DocumentPipeline::run(self, job).await;
    }
}
