//! PostgREST-style HTTP client for the persistence layer.

use super::{
    ChunkRecord, DocumentStore, QueuedDocument, RankedChunk, StatusUpdate, StoreError, StoredChunk,
};
use crate::config::Config;
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde_json::json;
use uuid::Uuid;

/// HTTP client for document and chunk persistence.
pub struct RestStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestStore {
    /// Construct a client from service configuration.
    pub fn from_config(config: &Config) -> Result<Self, StoreError> {
        let client = Client::builder().user_agent("docpipe/0.1").build()?;
        let base_url = normalize_base_url(&config.database_url).map_err(StoreError::InvalidUrl)?;
        tracing::debug!(url = %base_url, "Initialized persistence client");
        Ok(Self {
            client,
            base_url,
            api_key: config.database_api_key.clone(),
        })
    }

    #[cfg(test)]
    pub(crate) fn for_tests(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
            api_key: "test-key".to_string(),
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let base = self.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        self.client
            .request(method, format!("{base}/{path}"))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn ensure_success(&self, response: reqwest::Response) -> Result<(), StoreError> {
        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = StoreError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Store request failed");
            Err(error)
        }
    }
}

#[async_trait]
impl DocumentStore for RestStore {
    async fn insert_chunks(&self, chunks: &[ChunkRecord]) -> Result<(), StoreError> {
        if chunks.is_empty() {
            return Ok(());
        }

        let response = self
            .request(Method::POST, "rest/v1/document_chunks")
            .header("Prefer", "return=minimal")
            .json(&chunks)
            .send()
            .await?;
        self.ensure_success(response).await?;
        tracing::debug!(chunks = chunks.len(), "Chunks persisted");
        Ok(())
    }

    async fn update_document_status(
        &self,
        document_id: Uuid,
        update: StatusUpdate,
    ) -> Result<(), StoreError> {
        let response = self
            .request(Method::PATCH, "rest/v1/documents")
            .query(&[("id", format!("eq.{document_id}"))])
            .header("Prefer", "return=minimal")
            .json(&update)
            .send()
            .await?;
        self.ensure_success(response).await?;
        tracing::debug!(%document_id, status = ?update.processing_status, "Status updated");
        Ok(())
    }

    async fn list_queued(&self, limit: usize) -> Result<Vec<QueuedDocument>, StoreError> {
        let response = self
            .request(Method::GET, "rest/v1/documents")
            .query(&[
                ("select", "id,storage_url,mime_type,file_type".to_string()),
                ("processing_status", "eq.pending".to_string()),
                ("order", "uploaded_at.asc".to_string()),
                ("limit", limit.to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::UnexpectedStatus { status, body });
        }
        Ok(response.json().await?)
    }

    async fn rank_chunks(
        &self,
        query: &[f32],
        document_ids: &[Uuid],
        limit: usize,
    ) -> Result<Vec<RankedChunk>, StoreError> {
        let response = self
            .request(Method::POST, "rest/v1/rpc/rank_document_chunks")
            .json(&json!({
                "query_embedding": query,
                "document_ids": document_ids,
                "match_count": limit,
            }))
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(StoreError::RankingUnavailable),
            status if status.is_success() => Ok(response.json().await?),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(StoreError::UnexpectedStatus { status, body })
            }
        }
    }

    async fn fetch_embedded_chunks(
        &self,
        document_ids: &[Uuid],
    ) -> Result<Vec<StoredChunk>, StoreError> {
        let id_list = document_ids
            .iter()
            .map(Uuid::to_string)
            .collect::<Vec<_>>()
            .join(",");

        let response = self
            .request(Method::GET, "rest/v1/document_chunks")
            .query(&[
                (
                    "select",
                    "id,document_id,chunk_text,page_number,language,embedding".to_string(),
                ),
                ("document_id", format!("in.({id_list})")),
                ("embedding", "not.is.null".to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::UnexpectedStatus { status, body });
        }
        Ok(response.json().await?)
    }

    async fn delete_document(&self, document_id: Uuid) -> Result<Option<String>, StoreError> {
        let response = self
            .request(Method::DELETE, "rest/v1/documents")
            .query(&[("id", format!("eq.{document_id}"))])
            .header("Prefer", "return=representation")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::UnexpectedStatus { status, body });
        }

        #[derive(serde::Deserialize)]
        struct DeletedRow {
            storage_url: String,
        }
        let rows: Vec<DeletedRow> = response.json().await?;
        Ok(rows.into_iter().next().map(|row| row.storage_url))
    }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ProcessingStatus;
    use httpmock::{Method::GET, Method::PATCH, Method::POST, MockServer};
    use serde_json::json;

    #[tokio::test]
    async fn insert_chunks_posts_bulk_array() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/rest/v1/document_chunks")
                    .header("apikey", "test-key");
                then.status(201);
            })
            .await;

        let store = RestStore::for_tests(server.base_url());
        let document_id = Uuid::new_v4();
        let chunks = vec![ChunkRecord {
            document_id,
            chunk_index: 0,
            chunk_text: "clause text".into(),
            page_number: 1,
            language: "en".into(),
            embedding: vec![0.1, 0.2],
        }];
        store.insert_chunks(&chunks).await.expect("insert");
        mock.assert();
    }

    #[tokio::test]
    async fn status_update_patches_by_document_id() {
        let server = MockServer::start_async().await;
        let document_id = Uuid::new_v4();
        let mock = server
            .mock_async(|when, then| {
                when.method(PATCH)
                    .path("/rest/v1/documents")
                    .query_param("id", format!("eq.{document_id}"));
                then.status(204);
            })
            .await;

        let store = RestStore::for_tests(server.base_url());
        store
            .update_document_status(document_id, StatusUpdate::failed("boom"))
            .await
            .expect("update");
        mock.assert();
    }

    #[tokio::test]
    async fn list_queued_filters_pending_oldest_first() {
        let server = MockServer::start_async().await;
        let id = Uuid::new_v4();
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/rest/v1/documents")
                    .query_param("processing_status", "eq.pending")
                    .query_param("order", "uploaded_at.asc")
                    .query_param("limit", "10");
                then.status(200).json_body(json!([{
                    "id": id,
                    "storage_url": "https://blobs.example/report.pdf",
                    "mime_type": "application/pdf",
                    "file_type": "pdf",
                }]));
            })
            .await;

        let store = RestStore::for_tests(server.base_url());
        let queued = store.list_queued(10).await.expect("list");
        mock.assert();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].id, id);
        assert_eq!(queued[0].file_type, "pdf");
    }

    #[tokio::test]
    async fn missing_ranking_function_is_distinguished() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/rest/v1/rpc/rank_document_chunks");
                then.status(404).body("function not found");
            })
            .await;

        let store = RestStore::for_tests(server.base_url());
        let error = store
            .rank_chunks(&[0.1, 0.2], &[Uuid::new_v4()], 5)
            .await
            .unwrap_err();
        assert!(matches!(error, StoreError::RankingUnavailable));
    }

    #[tokio::test]
    async fn delete_returns_storage_url_of_removed_row() {
        let server = MockServer::start_async().await;
        let document_id = Uuid::new_v4();
        server
            .mock_async(|when, then| {
                when.method(httpmock::Method::DELETE)
                    .path("/rest/v1/documents")
                    .query_param("id", format!("eq.{document_id}"));
                then.status(200)
                    .json_body(json!([{ "storage_url": "https://blobs.example/gone.pdf" }]));
            })
            .await;

        let store = RestStore::for_tests(server.base_url());
        let url = store.delete_document(document_id).await.expect("delete");
        assert_eq!(url.as_deref(), Some("https://blobs.example/gone.pdf"));
    }

    #[test]
    fn status_enum_round_trips() {
        let json = serde_json::to_string(&ProcessingStatus::Pending).expect("json");
        assert_eq!(json, "\"pending\"");
    }
}
