//! HTTP surface of the ingestion service.
//!
//! Trigger endpoints hand work to the background queue and respond
//! immediately; they never wait for processing to finish. Job and search
//! endpoints require the shared worker secret; health and metrics are open.

use crate::metrics::PipelineMetrics;
use crate::pipeline::{JobQueue, ProcessRequest, QueueError};
use crate::search::{SearchError, SearchService};
use crate::storage::BlobFetcher;
use crate::store::{DocumentStore, StoreError};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Maximum documents admitted by a single poll.
pub const MAX_POLL_BATCH: usize = 10;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Background processing queue.
    pub queue: JobQueue,
    /// Document/chunk persistence.
    pub store: Arc<dyn DocumentStore>,
    /// Query-time search service.
    pub search: Arc<SearchService>,
    /// Blob storage client used for deletions.
    pub blobs: BlobFetcher,
    /// Pipeline counters served at `/metrics`.
    pub metrics: Arc<PipelineMetrics>,
    /// Shared secret required by the protected endpoints.
    pub worker_secret: String,
    /// Service start time, for uptime reporting.
    pub started_at: Instant,
}

/// Errors surfaced as HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Missing or wrong bearer token.
    #[error("unauthorized")]
    Unauthorized,
    /// The background queue no longer accepts jobs.
    #[error(transparent)]
    Queue(#[from] QueueError),
    /// Search failed.
    #[error(transparent)]
    Search(#[from] SearchError),
    /// Persistence failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Queue(QueueError::Full | QueueError::Closed) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Search(_) | AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Build the service router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/jobs/process", post(process_job))
        .route("/jobs/poll", post(poll_jobs))
        .route("/search", post(search))
        .route("/documents/:id", delete(delete_document))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .with_state(state)
}

fn authorize(headers: &HeaderMap, secret: &str) -> Result<(), AppError> {
    let token = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    match token {
        Some(token) if token == secret => Ok(()),
        _ => Err(AppError::Unauthorized),
    }
}

async fn process_job(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ProcessRequest>,
) -> Result<Response, AppError> {
    authorize(&headers, &state.worker_secret)?;

    let document_id = request.document_id;
    let queued = state.queue.enqueue(request).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "documentId": document_id, "queued": queued })),
    )
        .into_response())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PollRequest {
    count: Option<usize>,
}

async fn poll_jobs(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<PollRequest>>,
) -> Result<Response, AppError> {
    authorize(&headers, &state.worker_secret)?;

    let requested = body
        .map(|Json(request)| request.count.unwrap_or(MAX_POLL_BATCH))
        .unwrap_or(MAX_POLL_BATCH)
        .min(MAX_POLL_BATCH);

    let queued_documents = state.store.list_queued(requested).await?;
    let mut document_ids = Vec::with_capacity(queued_documents.len());
    for document in queued_documents {
        let accepted = state
            .queue
            .enqueue(ProcessRequest {
                document_id: document.id,
                storage_url: document.storage_url,
                mime_type: document.mime_type,
                file_type: document.file_type,
            })
            .await?;
        if accepted {
            document_ids.push(document.id);
        }
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "queued": document_ids.len(), "documentIds": document_ids })),
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest {
    query: String,
    document_ids: Vec<Uuid>,
    top_k: Option<usize>,
}

async fn search(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SearchRequest>,
) -> Result<Response, AppError> {
    authorize(&headers, &state.worker_secret)?;

    let hits = state
        .search
        .search(&request.query, &request.document_ids, request.top_k)
        .await?;
    Ok(Json(json!({ "results": hits })).into_response())
}

async fn delete_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(document_id): Path<Uuid>,
) -> Result<Response, AppError> {
    authorize(&headers, &state.worker_secret)?;

    let storage_url = state.store.delete_document(document_id).await?;
    let deleted = storage_url.is_some();
    if let Some(url) = storage_url {
        // Blob removal is best-effort; the row is already gone.
        if let Err(error) = state.blobs.delete(&url).await {
            tracing::warn!(%document_id, error = %error, "Blob deletion failed");
        }
    }

    Ok(Json(json!({ "documentId": document_id, "deleted": deleted })).into_response())
}

async fn health(State(state): State<AppState>) -> Response {
    Json(json!({
        "status": "ok",
        "uptimeSeconds": state.started_at.elapsed().as_secs(),
    }))
    .into_response()
}

async fn metrics(State(state): State<AppState>) -> Response {
    Json(state.metrics.snapshot()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{EmbeddingClient, EmbeddingClientError};
    use crate::pipeline::batcher::{BatcherConfig, EmbeddingBatcher};
    use crate::pipeline::queue::JobRunner;
    use crate::store::{
        ChunkRecord, QueuedDocument, RankedChunk, StatusUpdate, StoredChunk,
    };
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    struct NoopRunner {
        runs: AtomicUsize,
    }

    #[async_trait]
    impl JobRunner for NoopRunner {
        async fn run(&self, _job: ProcessRequest) {
            self.runs.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct StubClient;

    #[async_trait]
    impl EmbeddingClient for StubClient {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingClientError> {
            Ok(vec![1.0, 0.0])
        }
    }

    #[derive(Default)]
    struct StubStore {
        queued: Mutex<Vec<QueuedDocument>>,
        ranked: Mutex<Vec<RankedChunk>>,
        deleted_url: Option<String>,
    }

    #[async_trait]
    impl DocumentStore for StubStore {
        async fn insert_chunks(&self, _chunks: &[ChunkRecord]) -> Result<(), StoreError> {
            Ok(())
        }

        async fn update_document_status(
            &self,
            _document_id: Uuid,
            _update: StatusUpdate,
        ) -> Result<(), StoreError> {
            Ok(())
        }

        async fn list_queued(&self, limit: usize) -> Result<Vec<QueuedDocument>, StoreError> {
            let queued = self.queued.lock().unwrap();
            Ok(queued.iter().take(limit).cloned().collect())
        }

        async fn rank_chunks(
            &self,
            _query: &[f32],
            _document_ids: &[Uuid],
            limit: usize,
        ) -> Result<Vec<RankedChunk>, StoreError> {
            let ranked = self.ranked.lock().unwrap();
            Ok(ranked.iter().take(limit).cloned().collect())
        }

        async fn fetch_embedded_chunks(
            &self,
            _document_ids: &[Uuid],
        ) -> Result<Vec<StoredChunk>, StoreError> {
            Ok(Vec::new())
        }

        async fn delete_document(&self, _document_id: Uuid) -> Result<Option<String>, StoreError> {
            Ok(self.deleted_url.clone())
        }
    }

    fn router_with(store: Arc<StubStore>, runner: Arc<NoopRunner>) -> Router {
        let batcher = Arc::new(EmbeddingBatcher::new(
            Arc::new(StubClient),
            store.clone(),
            BatcherConfig::default(),
        ));
        let search = Arc::new(SearchService::new(batcher, store.clone()));
        create_router(AppState {
            queue: JobQueue::start(runner, 16),
            store,
            search,
            blobs: BlobFetcher::new().expect("fetcher"),
            metrics: Arc::new(PipelineMetrics::new()),
            worker_secret: "worker-secret".to_string(),
            started_at: Instant::now(),
        })
    }

    fn authed(request: axum::http::request::Builder) -> axum::http::request::Builder {
        request.header("Authorization", "Bearer worker-secret")
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn process_trigger_accepts_and_returns_before_work() {
        let runner = Arc::new(NoopRunner {
            runs: AtomicUsize::new(0),
        });
        let app = router_with(Arc::new(StubStore::default()), runner);

        let document_id = Uuid::new_v4();
        let payload = json!({
            "documentId": document_id,
            "storageUrl": "https://blobs.example/doc.pdf",
            "mimeType": "application/pdf",
            "fileType": "pdf",
        });
        let response = app
            .oneshot(
                authed(Request::builder().method("POST").uri("/jobs/process"))
                    .header("content-type", "application/json")
                    .body(Body::from(payload.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body = body_json(response).await;
        assert_eq!(body["queued"], true);
        assert_eq!(body["documentId"], json!(document_id));
    }

    #[tokio::test]
    async fn missing_token_is_unauthorized() {
        let runner = Arc::new(NoopRunner {
            runs: AtomicUsize::new(0),
        });
        let app = router_with(Arc::new(StubStore::default()), runner);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/jobs/poll")
                    .header("content-type", "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn wrong_token_is_unauthorized() {
        let runner = Arc::new(NoopRunner {
            runs: AtomicUsize::new(0),
        });
        let app = router_with(Arc::new(StubStore::default()), runner);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/jobs/poll")
                    .header("Authorization", "Bearer wrong")
                    .header("content-type", "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn poll_enqueues_pending_documents_up_to_cap() {
        let store = Arc::new(StubStore::default());
        {
            let mut queued = store.queued.lock().unwrap();
            for _ in 0..15 {
                queued.push(QueuedDocument {
                    id: Uuid::new_v4(),
                    storage_url: "https://blobs.example/doc.txt".to_string(),
                    mime_type: "text/plain".to_string(),
                    file_type: "text".to_string(),
                });
            }
        }
        let runner = Arc::new(NoopRunner {
            runs: AtomicUsize::new(0),
        });
        let app = router_with(store, runner);

        let response = app
            .oneshot(
                authed(Request::builder().method("POST").uri("/jobs/poll"))
                    .header("content-type", "application/json")
                    .body(Body::from(json!({ "count": 50 }).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body = body_json(response).await;
        assert_eq!(body["queued"], 10);
    }

    #[tokio::test]
    async fn search_returns_ranked_hits() {
        let store = Arc::new(StubStore::default());
        let document_id = Uuid::new_v4();
        store.ranked.lock().unwrap().push(RankedChunk {
            id: Uuid::new_v4(),
            document_id,
            chunk_text: "relevant clause".to_string(),
            page_number: 3,
            similarity: 0.91,
            language: "en".to_string(),
        });
        let runner = Arc::new(NoopRunner {
            runs: AtomicUsize::new(0),
        });
        let app = router_with(store, runner);

        let payload = json!({
            "query": "which clause covers audits",
            "documentIds": [document_id],
        });
        let response = app
            .oneshot(
                authed(Request::builder().method("POST").uri("/search"))
                    .header("content-type", "application/json")
                    .body(Body::from(payload.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["results"][0]["text"], "relevant clause");
        assert_eq!(body["results"][0]["pageNumber"], 3);
    }

    #[tokio::test]
    async fn delete_reports_whether_a_row_existed() {
        let store = Arc::new(StubStore::default());
        let runner = Arc::new(NoopRunner {
            runs: AtomicUsize::new(0),
        });
        let app = router_with(store, runner);

        let response = app
            .oneshot(
                authed(
                    Request::builder()
                        .method("DELETE")
                        .uri(format!("/documents/{}", Uuid::new_v4())),
                )
                .body(Body::empty())
                .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["deleted"], false);
    }

    #[tokio::test]
    async fn health_is_open_and_reports_uptime() {
        let runner = Arc::new(NoopRunner {
            runs: AtomicUsize::new(0),
        });
        let app = router_with(Arc::new(StubStore::default()), runner);

        let response = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert!(body["uptimeSeconds"].is_u64());
    }

    #[tokio::test]
    async fn metrics_is_open_and_starts_empty() {
        let runner = Arc::new(NoopRunner {
            runs: AtomicUsize::new(0),
        });
        let app = router_with(Arc::new(StubStore::default()), runner);

        let response = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["documents_completed"], 0);
    }
}
