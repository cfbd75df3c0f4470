//! In-process job queue with per-document admission control.

use super::ProcessRequest;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, mpsc};
use uuid::Uuid;

/// Executes one queued processing job to completion.
#[async_trait]
pub trait JobRunner: Send + Sync {
    /// Run a job. Failures are recorded on the document row, not returned.
    async fn run(&self, job: ProcessRequest);
}

/// Errors raised while enqueueing a job.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The queue is at capacity; the caller should retry later.
    #[error("job queue is full")]
    Full,
    /// The worker task has shut down and no longer accepts jobs.
    #[error("job queue is closed")]
    Closed,
}

/// Handle to the background processing queue.
///
/// At most one job per document is admitted at a time; a document already
/// queued or running is rejected rather than processed twice concurrently.
#[derive(Clone)]
pub struct JobQueue {
    tx: mpsc::Sender<ProcessRequest>,
    in_flight: Arc<Mutex<HashSet<Uuid>>>,
}

impl JobQueue {
    /// Spawn the queue worker and return the enqueue handle.
    pub fn start(runner: Arc<dyn JobRunner>, capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<ProcessRequest>(capacity);
        let in_flight: Arc<Mutex<HashSet<Uuid>>> = Arc::new(Mutex::new(HashSet::new()));

        let worker_set = in_flight.clone();
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                let runner = runner.clone();
                let in_flight = worker_set.clone();
                tokio::spawn(async move {
                    let document_id = job.document_id;
                    runner.run(job).await;
                    in_flight.lock().await.remove(&document_id);
                });
            }
            tracing::info!("Job queue worker stopped");
        });

        Self { tx, in_flight }
    }

    #[cfg(test)]
    fn with_sender(tx: mpsc::Sender<ProcessRequest>) -> Self {
        Self {
            tx,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Enqueue a job. Returns `Ok(false)` when the document is already in
    /// flight, `Ok(true)` when the job was accepted.
    ///
    /// The hand-off never waits for queue space; a full queue is reported as
    /// an error so trigger handlers keep responding immediately under load.
    pub async fn enqueue(&self, job: ProcessRequest) -> Result<bool, QueueError> {
        let document_id = job.document_id;
        {
            let mut in_flight = self.in_flight.lock().await;
            if !in_flight.insert(document_id) {
                tracing::debug!(%document_id, "Document already in flight, skipping");
                return Ok(false);
            }
        }

        if let Err(error) = self.tx.try_send(job) {
            self.in_flight.lock().await.remove(&document_id);
            return Err(match error {
                mpsc::error::TrySendError::Full(_) => {
                    tracing::warn!(%document_id, "Job queue is full, rejecting trigger");
                    QueueError::Full
                }
                mpsc::error::TrySendError::Closed(_) => QueueError::Closed,
            });
        }
        Ok(true)
    }
}
