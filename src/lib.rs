#![deny(missing_docs)]

//! Core library for the docpipe ingestion service.

/// HTTP routing and trigger handlers.
pub mod api;
/// Fixed-size sliding-window chunker.
pub mod chunking;
/// Environment-driven configuration management.
pub mod config;
/// Embedding provider abstraction and HTTP client.
pub mod embedding;
/// File-type-specific text extraction.
pub mod extract;
/// Document-level language identification.
pub mod language;
/// Structured logging and tracing setup.
pub mod logging;
/// Ingestion metrics helpers.
pub mod metrics;
/// Document processing pipeline and job queue.
pub mod pipeline;
/// Similarity search over persisted chunks.
pub mod search;
/// Blob storage read capability.
pub mod storage;
/// Persistence capability for documents and chunks.
pub mod store;
