//! Cost tracking and request batching for paid external classifiers.
//!
//! The tracker keeps a rolling-window ledger of estimated spend and exposes
//! warn/block thresholds. It never prevents a call itself; callers check
//! [`CostTracker::should_block`] and substitute the local fallback when the
//! window is exhausted.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::sync::{oneshot, Mutex, Notify};
use tokio::task::JoinHandle;

use crate::error::{AppError, Result};
use crate::services::classifier::{ClassificationProvider, ExternalClassification};

/// Price per 1K input/output units, by model.
const MODEL_UNIT_PRICES: &[(&str, f64, f64)] = &[
    ("lumen-classify-small", 0.00025, 0.00125),
    ("lumen-classify-large", 0.003, 0.015),
    ("lumen-score-small", 0.00015, 0.0006),
];

/// Fallback price for models missing from the table.
const DEFAULT_UNIT_PRICE: (f64, f64) = (0.001, 0.002);

/// Flat output-size estimate for a classification response.
const RESPONSE_UNIT_ESTIMATE: u64 = 32;

/// Rough unit count for a piece of text.
pub fn estimate_units(text: &str) -> u64 {
    (text.len() as u64 / 4).max(1)
}

#[derive(Debug, Clone)]
struct RecordedCall {
    cost_usd: f64,
    at: DateTime<Utc>,
}

/// Rolling-window ledger of external classifier spend.
pub struct CostTracker {
    limit_usd: f64,
    window: ChronoDuration,
    ledger: StdMutex<VecDeque<RecordedCall>>,
}

impl CostTracker {
    pub fn new(limit_usd: f64, window_secs: u64) -> Self {
        Self {
            limit_usd,
            window: ChronoDuration::seconds(window_secs as i64),
            ledger: StdMutex::new(VecDeque::new()),
        }
    }

    fn unit_price(model: &str) -> (f64, f64) {
        MODEL_UNIT_PRICES
            .iter()
            .find(|(name, _, _)| *name == model)
            .map(|(_, input, output)| (*input, *output))
            .unwrap_or(DEFAULT_UNIT_PRICE)
    }

    /// Record an external call's estimated cost. Returns the cost in USD.
    pub fn record_call(&self, model: &str, input_units: u64, output_units: u64) -> f64 {
        let (input_price, output_price) = Self::unit_price(model);
        let cost_usd = (input_units as f64 / 1_000.0) * input_price
            + (output_units as f64 / 1_000.0) * output_price;
        self.record_at(cost_usd, Utc::now());
        cost_usd
    }

    fn record_at(&self, cost_usd: f64, at: DateTime<Utc>) {
        let mut ledger = self
            .ledger
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        ledger.push_back(RecordedCall { cost_usd, at });
    }

    /// Total spend inside the rolling window. Expired entries are pruned.
    pub fn current_spend(&self) -> f64 {
        let cutoff = Utc::now() - self.window;
        let mut ledger = self
            .ledger
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        while let Some(front) = ledger.front() {
            if front.at < cutoff {
                ledger.pop_front();
            } else {
                break;
            }
        }
        ledger.iter().map(|call| call.cost_usd).sum()
    }

    /// Spend is at or past 90% of the limit.
    pub fn should_warn(&self) -> bool {
        self.current_spend() >= self.limit_usd * 0.9
    }

    /// Spend is at or past the limit. Callers substitute the local fallback.
    pub fn should_block(&self) -> bool {
        self.current_spend() >= self.limit_usd
    }

    pub fn limit_usd(&self) -> f64 {
        self.limit_usd
    }
}

struct PendingJob {
    text: String,
    respond_to: oneshot::Sender<Result<ExternalClassification>>,
}

/// Batches classification requests before hitting the paid provider.
///
/// A batch flushes when it reaches `batch_size` or when the flush interval
/// elapses, whichever comes first. A batch-processing failure rejects every
/// job in that batch; retries belong to the caller.
pub struct ClassificationBatcher {
    provider: Arc<dyn ClassificationProvider>,
    cost: Arc<CostTracker>,
    queue: Mutex<Vec<PendingJob>>,
    batch_size: usize,
    flush_interval: Duration,
    notify: Notify,
}

impl ClassificationBatcher {
    pub fn new(
        provider: Arc<dyn ClassificationProvider>,
        cost: Arc<CostTracker>,
        batch_size: usize,
        flush_interval: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            provider,
            cost,
            queue: Mutex::new(Vec::new()),
            batch_size: batch_size.max(1),
            flush_interval,
            notify: Notify::new(),
        })
    }

    /// Run the flush loop. Intended to be spawned on the Tokio runtime.
    pub fn spawn_flush_loop(self: Arc<Self>) -> JoinHandle<()> {
        let batcher = self;
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(batcher.flush_interval) => {}
                    _ = batcher.notify.notified() => {}
                }
                batcher.flush().await;
            }
        })
    }

    /// Enqueue a request and wait for its batch to be processed.
    pub async fn classify(&self, text: &str) -> Result<ExternalClassification> {
        let (tx, rx) = oneshot::channel();
        {
            let mut queue = self.queue.lock().await;
            queue.push(PendingJob {
                text: text.to_string(),
                respond_to: tx,
            });
            if queue.len() >= self.batch_size {
                self.notify.notify_one();
            }
        }

        rx.await
            .map_err(|_| AppError::ExternalService("classification batch was dropped".into()))?
    }

    /// Drain and process everything currently queued.
    pub async fn flush(&self) {
        let jobs: Vec<PendingJob> = {
            let mut queue = self.queue.lock().await;
            std::mem::take(&mut *queue)
        };
        if jobs.is_empty() {
            return;
        }

        tracing::debug!("Flushing classification batch ({} jobs)", jobs.len());
        let texts: Vec<String> = jobs.iter().map(|job| job.text.clone()).collect();

        match self.provider.classify_batch(&texts).await {
            Ok(results) if results.len() == jobs.len() => {
                for (job, result) in jobs.into_iter().zip(results) {
                    self.cost.record_call(
                        self.provider.model(),
                        estimate_units(&job.text),
                        RESPONSE_UNIT_ESTIMATE,
                    );
                    let _ = job.respond_to.send(Ok(result));
                }
            }
            Ok(results) => {
                tracing::error!(
                    expected = jobs.len(),
                    got = results.len(),
                    "Classification batch returned wrong result count"
                );
                for job in jobs {
                    let _ = job.respond_to.send(Err(AppError::ExternalService(
                        "classification batch returned wrong result count".into(),
                    )));
                }
            }
            Err(e) => {
                let reason = e.to_string();
                tracing::warn!(error = %reason, "Classification batch failed; rejecting all jobs");
                for job in jobs {
                    let _ = job.respond_to.send(Err(AppError::ExternalService(format!(
                        "classification batch failed: {}",
                        reason
                    ))));
                }
            }
        }
    }
}
