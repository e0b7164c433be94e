//! Background job that recomputes trending records on a cadence.
//!
//! Runs once shortly after startup and then hourly. Overlapping runs are
//! skipped: two concurrent recomputes would race on the same upsert keys
//! for no benefit.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};

use crate::metrics::pipeline::TRENDING_RUNS_TOTAL;
use crate::services::TrendingCalculator;

#[derive(Clone)]
pub struct TrendingRefreshJob {
    calculator: Arc<TrendingCalculator>,
    interval: Duration,
    startup_delay: Duration,
    running: Arc<Mutex<()>>,
}

impl TrendingRefreshJob {
    pub fn new(
        calculator: Arc<TrendingCalculator>,
        interval_secs: u64,
        startup_delay_secs: u64,
    ) -> Self {
        Self {
            calculator,
            interval: Duration::from_secs(interval_secs.max(1)),
            startup_delay: Duration::from_secs(startup_delay_secs),
            running: Arc::new(Mutex::new(())),
        }
    }

    /// Run the refresh loop. Intended to be spawned on the Tokio runtime.
    pub async fn run(self) {
        let mut ticker = interval_at(Instant::now() + self.startup_delay, self.interval);
        tracing::info!(
            "Trending refresh job started (interval: {:?}, startup delay: {:?})",
            self.interval,
            self.startup_delay
        );

        loop {
            ticker.tick().await;
            self.run_once().await;
        }
    }

    /// Spawn the refresh loop as a Tokio task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// One recompute pass. Skips if a previous pass is still in flight.
    pub async fn run_once(&self) {
        let _guard = match self.running.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                TRENDING_RUNS_TOTAL.with_label_values(&["skipped"]).inc();
                tracing::warn!("Previous trending recompute still running, skipping this tick");
                return;
            }
        };

        match self.calculator.recompute_all().await {
            Ok(written) => {
                TRENDING_RUNS_TOTAL.with_label_values(&["success"]).inc();
                tracing::info!(records = written, "Trending recompute finished");
            }
            Err(e) => {
                TRENDING_RUNS_TOTAL.with_label_values(&["error"]).inc();
                tracing::error!(error = %e, "Trending recompute failed");
            }
        }
    }
}
