use docpipe::api::{AppState, create_router};
use docpipe::chunking::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use docpipe::config::{self, Config};
use docpipe::embedding::HttpEmbeddingClient;
use docpipe::extract::{Extractor, ExtractorConfig};
use docpipe::logging;
use docpipe::metrics::PipelineMetrics;
use docpipe::pipeline::batcher::{BatcherConfig, EmbeddingBatcher};
use docpipe::pipeline::{DocumentPipeline, JobQueue};
use docpipe::search::SearchService;
use docpipe::storage::BlobFetcher;
use docpipe::store::RestStore;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() {
    let config = config::init_config().expect("Failed to load configuration");
    let _log_guard = logging::init_tracing(config.log_file.as_deref());

    let app = create_router(build_state(&config).expect("Failed to build service state"));

    let (listener, port) = bind_listener(&config)
        .await
        .expect("Failed to bind listener");
    tracing::info!("Listening on http://0.0.0.0:{}", port);
    axum::serve(listener, app).await.unwrap();
}

fn build_state(config: &Config) -> Result<AppState, Box<dyn std::error::Error>> {
    let store = Arc::new(RestStore::from_config(config)?);
    let embedding_client = Arc::new(HttpEmbeddingClient::from_config(config)?);
    let metrics = Arc::new(PipelineMetrics::new());
    let blobs = BlobFetcher::new()?;

    let extractor = Extractor::new(ExtractorConfig {
        ocr_language: config
            .ocr_language
            .clone()
            .unwrap_or_else(|| docpipe::extract::DEFAULT_OCR_LANGUAGE.to_string()),
        ..ExtractorConfig::default()
    });

    let batcher = EmbeddingBatcher::new(
        embedding_client.clone(),
        store.clone(),
        BatcherConfig::default(),
    );
    let pipeline = Arc::new(DocumentPipeline::new(
        blobs.clone(),
        extractor,
        store.clone(),
        batcher,
        metrics.clone(),
        config.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE),
        config.chunk_overlap.unwrap_or(DEFAULT_CHUNK_OVERLAP),
    ));
    let queue = JobQueue::start(pipeline, 64);

    let search_batcher = Arc::new(EmbeddingBatcher::new(
        embedding_client,
        store.clone(),
        BatcherConfig::default(),
    ));
    let search = Arc::new(SearchService::new(search_batcher, store.clone()));

    Ok(AppState {
        queue,
        store,
        search,
        blobs,
        metrics,
        worker_secret: config.worker_secret.clone(),
        started_at: Instant::now(),
    })
}

async fn bind_listener(config: &Config) -> Result<(TcpListener, u16), std::io::Error> {
    use std::net::Ipv4Addr;

    if let Some(port) = config.server_port {
        return TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .map(|listener| (listener, port));
    }

    const PORT_RANGE: std::ops::RangeInclusive<u16> = 4300..=4399;
    for port in PORT_RANGE {
        match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await {
            Ok(listener) => {
                tracing::debug!(port, "Bound server port");
                return Ok((listener, port));
            }
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port already in use; trying next");
                continue;
            }
            Err(err) => return Err(err),
        }
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::AddrNotAvailable,
        "No available port found in range 4300-4399",
    ))
}
