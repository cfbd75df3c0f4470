//! HTTP embedding provider client.

use super::{EmbeddingClient, EmbeddingClientError};
use crate::config::Config;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;

/// Client for an OpenAI-style `/embeddings` endpoint.
pub struct HttpEmbeddingClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    dimension: usize,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}

impl HttpEmbeddingClient {
    /// Build a client from service configuration.
    pub fn from_config(config: &Config) -> Result<Self, EmbeddingClientError> {
        let client = Client::builder().user_agent("docpipe/0.1").build()?;
        Ok(Self {
            client,
            base_url: config.embedding_api_url.trim_end_matches('/').to_string(),
            api_key: config.embedding_api_key.clone(),
            model: config.embedding_model.clone(),
            dimension: config.embedding_dimension,
        })
    }

    #[cfg(test)]
    fn for_tests(base_url: String, model: &str, dimension: usize) -> Self {
        Self {
            client: Client::new(),
            base_url,
            api_key: None,
            model: model.to_string(),
            dimension,
        }
    }
}

#[async_trait]
impl EmbeddingClient for HttpEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingClientError> {
        let url = format!("{}/embeddings", self.base_url);
        let mut request = self.client.post(&url).json(&json!({
            "input": [text],
            "model": self.model,
        }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(EmbeddingClientError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingClientError::UnexpectedStatus { status, body });
        }

        let payload: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|err| EmbeddingClientError::MalformedResponse(err.to_string()))?;
        let vector = payload
            .data
            .into_iter()
            .next()
            .map(|item| item.embedding)
            .ok_or_else(|| {
                EmbeddingClientError::MalformedResponse("response contained no embeddings".into())
            })?;

        if vector.is_empty() || vector.len() != self.dimension {
            return Err(EmbeddingClientError::MalformedResponse(format!(
                "expected a {}-dimensional vector, got {}",
                self.dimension,
                vector.len()
            )));
        }

        Ok(vector)
    }
}
