//! Blob storage read capability.
//!
//! Uploaded documents live in an external object store; the pipeline only
//! fetches raw bytes by URL. Fetches are bounded by a 60-second timeout and
//! fail the run when exceeded. Deletion is best-effort and tolerated on
//! failure by callers.

use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

/// Upper bound on a single blob fetch.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Errors raised while fetching document bytes.
#[derive(Debug, Error)]
pub enum StorageFetchError {
    /// The fetch exceeded the configured timeout.
    #[error("timed out fetching document bytes")]
    Timeout,
    /// Transport-level failure reaching the object store.
    #[error("storage request failed: {0}")]
    Request(reqwest::Error),
    /// Object store replied with a non-success status.
    #[error("storage returned {status}")]
    UnexpectedStatus {
        /// HTTP status code of the response.
        status: reqwest::StatusCode,
    },
}

/// HTTP client for reading uploaded document bytes.
#[derive(Clone)]
pub struct BlobFetcher {
    client: Client,
}

impl BlobFetcher {
    /// Build a fetcher with the standard timeout applied.
    pub fn new() -> Result<Self, StorageFetchError> {
        let client = Client::builder()
            .user_agent("docpipe/0.1")
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(StorageFetchError::Request)?;
        Ok(Self { client })
    }

    /// Fetch the raw bytes behind a storage URL.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, StorageFetchError> {
        let response = self.client.get(url).send().await.map_err(classify)?;
        let status = response.status();
        if !status.is_success() {
            return Err(StorageFetchError::UnexpectedStatus { status });
        }
        let bytes = response.bytes().await.map_err(classify)?;
        tracing::debug!(url, bytes = bytes.len(), "Fetched document bytes");
        Ok(bytes.to_vec())
    }

    /// Delete the blob behind a storage URL. Callers treat failures as
    /// non-fatal and log them.
    pub async fn delete(&self, url: &str) -> Result<(), StorageFetchError> {
        let response = self.client.delete(url).send().await.map_err(classify)?;
        let status = response.status();
        if !status.is_success() {
            return Err(StorageFetchError::UnexpectedStatus { status });
        }
        Ok(())
    }
}

fn classify(err: reqwest::Error) -> StorageFetchError {
    if err.is_timeout() {
        StorageFetchError::Timeout
    } else {
        StorageFetchError::Request(err)
    }
}
