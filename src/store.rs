//! Persistence capability for documents and chunks.
//!
//! The pipeline reads and writes document rows and chunk rows through the
//! [`DocumentStore`] trait; [`RestStore`] implements it against a
//! PostgREST-style HTTP API. Status writes are full-record updates keyed by
//! document id with no optimistic-concurrency check.

mod rest;

pub use rest::RestStore;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

/// Document lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    /// Created at upload, awaiting processing.
    Pending,
    /// Pipeline run in progress.
    Processing,
    /// Terminal success.
    Completed,
    /// Terminal failure.
    Failed,
}

/// Full-record status write applied to a document row.
///
/// Every transition writes all four fields so a reprocessing run replaces the
/// previous record wholesale rather than merging into it.
#[derive(Debug, Clone, Serialize)]
pub struct StatusUpdate {
    /// New lifecycle state.
    pub processing_status: ProcessingStatus,
    /// Failure message; set if and only if the status is `failed`.
    pub processing_error: Option<String>,
    /// Extracted page count; set only on `completed`.
    pub total_pages: Option<u32>,
    /// Completion timestamp (RFC3339); set if and only if the status is `completed`.
    pub processed_at: Option<String>,
}

impl StatusUpdate {
    /// Transition into `processing`, clearing any previous outcome fields.
    pub fn processing() -> Self {
        Self {
            processing_status: ProcessingStatus::Processing,
            processing_error: None,
            total_pages: None,
            processed_at: None,
        }
    }

    /// Terminal success with the document's page count.
    pub fn completed(total_pages: u32) -> Self {
        Self {
            processing_status: ProcessingStatus::Completed,
            processing_error: None,
            total_pages: Some(total_pages),
            processed_at: Some(current_timestamp_rfc3339()),
        }
    }

    /// Terminal failure carrying the triggering error's message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            processing_status: ProcessingStatus::Failed,
            processing_error: Some(message.into()),
            total_pages: None,
            processed_at: None,
        }
    }
}

/// A chunk ready for bulk insertion.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkRecord {
    /// Owning document.
    pub document_id: Uuid,
    /// Position within the document, assigned in page order.
    pub chunk_index: u32,
    /// Chunk text, truncated for storage.
    pub chunk_text: String,
    /// Page the chunk came from.
    pub page_number: u32,
    /// ISO-639-1 language code shared by all chunks of the document.
    pub language: String,
    /// Embedding vector.
    pub embedding: Vec<f32>,
}

/// A document row still waiting to be processed.
#[derive(Debug, Clone, Deserialize)]
pub struct QueuedDocument {
    /// Document id.
    pub id: Uuid,
    /// Location of the uploaded bytes.
    pub storage_url: String,
    /// Declared MIME type.
    pub mime_type: String,
    /// Declared file type name.
    pub file_type: String,
}

/// A chunk ranked by the database-side vector search.
#[derive(Debug, Clone, Deserialize)]
pub struct RankedChunk {
    /// Chunk id.
    pub id: Uuid,
    /// Owning document.
    pub document_id: Uuid,
    /// Stored chunk text.
    pub chunk_text: String,
    /// Page the chunk came from.
    pub page_number: u32,
    /// Similarity score, descending in the result order.
    pub similarity: f32,
    /// Stored language code.
    pub language: String,
}

/// A stored chunk with its embedding, used by the manual search fallback.
#[derive(Debug, Clone, Deserialize)]
pub struct StoredChunk {
    /// Chunk id.
    pub id: Uuid,
    /// Owning document.
    pub document_id: Uuid,
    /// Stored chunk text.
    pub chunk_text: String,
    /// Page the chunk came from.
    pub page_number: u32,
    /// Stored language code.
    pub language: String,
    /// Embedding vector.
    pub embedding: Vec<f32>,
}

/// Errors raised by the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Configured base URL could not be parsed.
    #[error("invalid store URL: {0}")]
    InvalidUrl(String),
    /// Transport-level failure reaching the store.
    #[error("store request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// Store replied with an unexpected HTTP status.
    #[error("store returned {status}: {body}")]
    UnexpectedStatus {
        /// HTTP status code of the response.
        status: StatusCode,
        /// Response body captured for diagnostics.
        body: String,
    },
    /// The database-side vector ranking function is not installed.
    #[error("vector ranking function unavailable")]
    RankingUnavailable,
}

/// Interface to the document/chunk persistence layer.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Bulk-insert chunk records for a document.
    async fn insert_chunks(&self, chunks: &[ChunkRecord]) -> Result<(), StoreError>;

    /// Apply a full-record status update to a document.
    async fn update_document_status(
        &self,
        document_id: Uuid,
        update: StatusUpdate,
    ) -> Result<(), StoreError>;

    /// List documents still in the queued state, oldest first.
    async fn list_queued(&self, limit: usize) -> Result<Vec<QueuedDocument>, StoreError>;

    /// Rank chunks of the candidate documents against a query vector.
    ///
    /// Returns [`StoreError::RankingUnavailable`] when the database-side
    /// ranking function is not installed.
    async fn rank_chunks(
        &self,
        query: &[f32],
        document_ids: &[Uuid],
        limit: usize,
    ) -> Result<Vec<RankedChunk>, StoreError>;

    /// Fetch every embedded chunk belonging to the candidate documents.
    async fn fetch_embedded_chunks(
        &self,
        document_ids: &[Uuid],
    ) -> Result<Vec<StoredChunk>, StoreError>;

    /// Delete a document row (chunks cascade), returning its storage URL when
    /// a row was deleted.
    async fn delete_document(&self, document_id: Uuid) -> Result<Option<String>, StoreError>;
}

pub(crate) fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn processing_clears_outcome_fields() {
        let update = StatusUpdate::processing();
        assert_eq!(update.processing_status, ProcessingStatus::Processing);
        assert!(update.processing_error.is_none());
        assert!(update.total_pages.is_none());
        assert!(update.processed_at.is_none());
    }

    #[test]
    fn completed_sets_timestamp_and_pages_only() {
        let update = StatusUpdate::completed(7);
        assert_eq!(update.processing_status, ProcessingStatus::Completed);
        assert_eq!(update.total_pages, Some(7));
        assert!(update.processing_error.is_none());
        let timestamp = update.processed_at.expect("processed_at");
        assert!(timestamp.contains('T'));
    }

    #[test]
    fn failed_sets_error_only() {
        let update = StatusUpdate::failed("no pages extracted");
        assert_eq!(update.processing_status, ProcessingStatus::Failed);
        assert_eq!(update.processing_error.as_deref(), Some("no pages extracted"));
        assert!(update.total_pages.is_none());
        assert!(update.processed_at.is_none());
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_value(StatusUpdate::processing()).expect("json");
        assert_eq!(json["processing_status"], "processing");
        // Full-record semantics: cleared fields are written as explicit nulls.
        assert!(json["processing_error"].is_null());
        assert!(json["total_pages"].is_null());
        assert!(json["processed_at"].is_null());
    }
}
