use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Per-stage counters.
///
/// Handles clone cheaply and share the same counters, so a stage can keep
/// recording while callers observe from another thread.
#[derive(Debug, Clone)]
pub struct StageMetrics {
    processed: Arc<AtomicU64>,
    busy_nanos: Arc<AtomicU64>,
    started: Instant,
}

impl StageMetrics {
    pub fn new() -> Self {
        Self {
            processed: Arc::new(AtomicU64::new(0)),
            busy_nanos: Arc::new(AtomicU64::new(0)),
            started: Instant::now(),
        }
    }

    /// Record one completed step and the time it spent.
    pub fn record_step(&self, elapsed: Duration) {
        self.processed.fetch_add(1, Ordering::Relaxed);
        self.busy_nanos
            .fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);
    }

    /// Total items processed by the stage so far.
    pub fn total_processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Throughput in items per second since the stage was created.
    pub fn throughput_mps(&self) -> f64 {
        let elapsed = self.started.elapsed().as_secs_f64();
        if elapsed == 0.0 {
            0.0
        } else {
            self.total_processed() as f64 / elapsed
        }
    }

    /// Mean time per step in microseconds.
    pub fn mean_step_us(&self) -> f64 {
        let processed = self.total_processed();
        if processed == 0 {
            0.0
        } else {
            let busy = self.busy_nanos.load(Ordering::Relaxed);
            busy as f64 / processed as f64 / 1000.0
        }
    }
}

impl Default for StageMetrics {
    fn default() -> Self {
        Self::new()
    }
}
