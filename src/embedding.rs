//! Embedding provider abstraction.
//!
//! The pipeline talks to the embedding model through [`EmbeddingClient`], one
//! text per call. Rate-limit responses are surfaced as a dedicated error
//! variant so the batcher can retry them; everything else is terminal for the
//! calling chunk.

mod http;

pub use http::HttpEmbeddingClient;

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// Provider signalled that requests are arriving too fast.
    #[error("embedding provider rate limited the request")]
    RateLimited,
    /// Transport-level failure reaching the provider.
    #[error("embedding request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// Provider replied with an unexpected HTTP status.
    #[error("embedding provider returned {status}: {body}")]
    UnexpectedStatus {
        /// HTTP status code of the response.
        status: StatusCode,
        /// Response body captured for diagnostics.
        body: String,
    },
    /// Provider response could not be interpreted as an embedding.
    #[error("malformed embedding response: {0}")]
    MalformedResponse(String),
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Produce an embedding vector for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingClientError>;
}
