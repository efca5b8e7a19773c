use crate::metrics::StageMetrics;
use crate::queue::Writer;
use parking_lot::Mutex;
use std::time::Instant;

/// Drives a transform across a shared input, one item per step.
///
/// The input iterator is shared by every worker executing the stage and
/// guarded by a mutex, so each item is dequeued by exactly one worker.
/// The mutex is released before the transform runs; a slow transform never
/// starves sibling workers of input, and no two queue locks are ever held
/// at once.
///
/// The executor holds one [`Writer`] onto its output queue. Workers share
/// the executor through an `Arc`; when the last of them drops its
/// reference the writer goes with it, which is what closes the output and
/// propagates end-of-stream downstream.
pub struct StageExecutor<I, O, F> {
    input: Mutex<I>,
    writer: Writer<O>,
    transform: F,
    metrics: StageMetrics,
}

impl<I, O, F> StageExecutor<I, O, F>
where
    I: Iterator,
    F: Fn(I::Item) -> O,
{
    pub fn new(input: I, writer: Writer<O>, transform: F) -> Self {
        Self {
            input: Mutex::new(input),
            writer,
            transform,
            metrics: StageMetrics::new(),
        }
    }

    /// A handle onto this stage's counters.
    pub fn metrics(&self) -> StageMetrics {
        self.metrics.clone()
    }

    /// Process one input item.
    ///
    /// Returns `false` when the input is exhausted; the stage has then no
    /// more work and its task can be retired. Items are moved out of the
    /// input, applied to the transform, and pushed to the output queue.
    pub fn step(&self) -> bool {
        let item = self.input.lock().next();
        match item {
            Some(item) => {
                let start = Instant::now();
                let output = (self.transform)(item);
                self.writer.push(output);
                self.metrics.record_step(start.elapsed());
                true
            }
            None => false,
        }
    }

    /// Loop [`step`](StageExecutor::step) until the input is exhausted.
    pub fn process_all(&self) {
        while self.step() {}
    }
}
