//! Background moderation pipeline.
//!
//! Content submission returns immediately; processing happens on a bounded
//! worker pool. Jobs that exhaust their attempts or hit the hard timeout go
//! to the dead-letter path, which parks the item for human review so nothing
//! is ever left silently pending.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::error::{AppError, Result};
use crate::metrics::pipeline::PIPELINE_JOBS_TOTAL;
use crate::models::ContentType;
use crate::services::ModerationService;

#[derive(Debug, Clone, Copy)]
pub struct ModerationJob {
    pub content_id: Uuid,
    pub content_type: ContentType,
}

/// Bounded worker pool driving the moderation orchestrator.
pub struct ModerationWorkerPool {
    tx: mpsc::Sender<ModerationJob>,
    handles: Vec<JoinHandle<()>>,
}

impl ModerationWorkerPool {
    pub fn start(moderation: Arc<ModerationService>, config: &PipelineConfig) -> Self {
        let (tx, rx) = mpsc::channel::<ModerationJob>(config.queue_depth.max(1));
        let rx = Arc::new(Mutex::new(rx));

        let worker_count = config.workers.max(1);
        let mut handles = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            handles.push(tokio::spawn(worker_loop(
                worker_id,
                Arc::clone(&rx),
                Arc::clone(&moderation),
                Duration::from_secs(config.stage_timeout_secs),
                config.max_attempts.max(1),
            )));
        }

        tracing::info!(workers = worker_count, "Moderation worker pool started");
        Self { tx, handles }
    }

    /// Fire-and-forget submission. Errors only when the queue is full.
    pub fn submit(&self, content_id: Uuid, content_type: ContentType) -> Result<()> {
        self.tx
            .try_send(ModerationJob {
                content_id,
                content_type,
            })
            .map_err(|_| AppError::PipelineUnavailable("moderation queue is full".into()))
    }

    /// Close the queue and wait for in-flight jobs to finish.
    pub async fn shutdown(self) {
        drop(self.tx);
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Moderation worker join failed");
            }
        }
        tracing::info!("Moderation worker pool stopped");
    }
}

async fn worker_loop(
    worker_id: usize,
    rx: Arc<Mutex<mpsc::Receiver<ModerationJob>>>,
    moderation: Arc<ModerationService>,
    stage_timeout: Duration,
    max_attempts: u32,
) {
    loop {
        let job = {
            let mut rx = rx.lock().await;
            rx.recv().await
        };
        let job = match job {
            Some(job) => job,
            None => break,
        };

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let result = tokio::time::timeout(
                stage_timeout,
                moderation.process(job.content_id, job.content_type),
            )
            .await;

            let failure = match result {
                Ok(Ok(())) => {
                    PIPELINE_JOBS_TOTAL.with_label_values(&["processed"]).inc();
                    break;
                }
                Ok(Err(e)) => e.to_string(),
                Err(_) => format!("processing timed out after {:?}", stage_timeout),
            };

            if attempt < max_attempts {
                PIPELINE_JOBS_TOTAL.with_label_values(&["retried"]).inc();
                tracing::warn!(
                    worker_id,
                    content_id = %job.content_id,
                    attempt,
                    error = %failure,
                    "Moderation attempt failed, retrying"
                );
                tokio::time::sleep(Duration::from_millis(100 * attempt as u64)).await;
                continue;
            }

            // Dead-letter: park the item for human review.
            PIPELINE_JOBS_TOTAL.with_label_values(&["dead_letter"]).inc();
            tracing::error!(
                worker_id,
                content_id = %job.content_id,
                attempts = attempt,
                error = %failure,
                "Moderation attempts exhausted, routing to dead-letter path"
            );
            if let Err(e) = moderation
                .mark_processing_failure(job.content_id, job.content_type, &failure)
                .await
            {
                tracing::error!(
                    content_id = %job.content_id,
                    error = %e,
                    "Failed to park content after pipeline failure"
                );
            }
            break;
        }
    }

    tracing::debug!(worker_id, "Moderation worker exiting");
}
