use crate::error::{Error, Result};
use crate::metrics::StageMetrics;
use crate::pool::{default_parallelism, ThreadPool};
use crate::queue::{StreamIter, StreamQueue};
use crate::stage::StageExecutor;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// A single running pipeline stage, ready to iterate or chain.
///
/// Wires an input iterator and a transform to an output [`StreamQueue`],
/// executed either by privately owned worker threads or as one multitask
/// on a shared [`ThreadPool`]. The output closes by itself once every
/// worker has finished, so consumers simply iterate until the stream
/// ends.
///
/// Stages chain by feeding one pipeline's [`iter`](Pipeline::iter) to the
/// next pipeline's constructor:
///
/// ```
/// use parastream::Pipeline;
///
/// let add = Pipeline::new(0..10i64, |x| x + 1);
/// let sub = Pipeline::new(add.iter(), |x: i64| x - 1);
/// assert_eq!(sub.iter().sum::<i64>(), 45);
/// ```
pub struct Pipeline<O> {
    output: StreamQueue<O>,
    metrics: StageMetrics,
    workers: Vec<JoinHandle<()>>,
}

impl<O> Pipeline<O> {
    /// Run `transform` over `input` with one worker per available
    /// hardware thread.
    pub fn new<I, F>(input: I, transform: F) -> Self
    where
        I: Iterator + Send + 'static,
        O: Send + 'static,
        F: Fn(I::Item) -> O + Send + Sync + 'static,
    {
        Self::spawn(input, transform, default_parallelism())
    }

    /// Run `transform` over `input` with a private team of `workers`
    /// threads, joined when the pipeline drops.
    pub fn with_workers<I, F>(input: I, transform: F, workers: usize) -> Result<Self>
    where
        I: Iterator + Send + 'static,
        O: Send + 'static,
        F: Fn(I::Item) -> O + Send + Sync + 'static,
    {
        if workers == 0 {
            return Err(Error::NoWorkers);
        }
        Ok(Self::spawn(input, transform, workers))
    }

    fn spawn<I, F>(input: I, transform: F, workers: usize) -> Self
    where
        I: Iterator + Send + 'static,
        O: Send + 'static,
        F: Fn(I::Item) -> O + Send + Sync + 'static,
    {
        let output = StreamQueue::new();
        let executor = Arc::new(StageExecutor::new(input, output.make_writer(), transform));
        let metrics = executor.metrics();
        let workers = (0..workers)
            .map(|_| {
                let executor = Arc::clone(&executor);
                thread::spawn(move || executor.process_all())
            })
            .collect();
        Self {
            output,
            metrics,
            workers,
        }
    }

    /// Run `transform` over `input` as a single multitask on a shared
    /// pool.
    ///
    /// The stage owns no threads; the pool's workers step it alongside
    /// every other registered stage. Register chained stages
    /// upstream-first (construction order does this) so each pool pass
    /// feeds a stage before visiting the stages downstream of it.
    pub fn with_pool<I, F>(input: I, transform: F, pool: &ThreadPool) -> Self
    where
        I: Iterator + Send + 'static,
        O: Send + 'static,
        F: Fn(I::Item) -> O + Send + Sync + 'static,
    {
        let output = StreamQueue::new();
        let executor = StageExecutor::new(input, output.make_writer(), transform);
        let metrics = executor.metrics();
        // The closure is the executor's only owner; when the pool retires
        // the task and the last worker releases it, the writer drops and
        // the output closes.
        pool.process(move || executor.step());
        Self {
            output,
            metrics,
            workers: Vec::new(),
        }
    }

    /// A lazy consuming iterator over the stage's output.
    pub fn iter(&self) -> StreamIter<O> {
        self.output.iter()
    }

    /// Wait for and remove the next output value; `None` once the stage
    /// has finished and its output has drained.
    pub fn pop(&self) -> Option<O> {
        self.output.pop()
    }

    /// Number of output values currently buffered.
    pub fn len(&self) -> usize {
        self.output.len()
    }

    /// Whether the output buffer is currently empty.
    pub fn is_empty(&self) -> bool {
        self.output.is_empty()
    }

    /// Counters for this stage.
    pub fn metrics(&self) -> StageMetrics {
        self.metrics.clone()
    }
}

impl<O> Drop for Pipeline<O> {
    fn drop(&mut self) {
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                eprintln!("pipeline: stage worker panicked");
            }
        }
    }
}

impl<'a, O> IntoIterator for &'a Pipeline<O> {
    type Item = O;
    type IntoIter = StreamIter<O>;

    fn into_iter(self) -> StreamIter<O> {
        self.iter()
    }
}

impl<O> IntoIterator for Pipeline<O> {
    type Item = O;
    type IntoIter = PipelineIter<O>;

    fn into_iter(self) -> PipelineIter<O> {
        let iter = self.iter();
        PipelineIter {
            iter,
            _pipeline: self,
        }
    }
}

/// Owning iterator over a pipeline's output; keeps the stage's worker
/// threads alive until iteration finishes.
pub struct PipelineIter<O> {
    iter: StreamIter<O>,
    _pipeline: Pipeline<O>,
}

impl<O> Iterator for PipelineIter<O> {
    type Item = O;

    fn next(&mut self) -> Option<O> {
        self.iter.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn squares_multiset() {
        let pipeline = Pipeline::new(vec![1, 2, 3].into_iter(), |x: i32| x * x);
        let mut out: Vec<i32> = pipeline.iter().collect();
        out.sort_unstable();
        assert_eq!(out, vec![1, 4, 9]);
    }

    #[test]
    fn zero_workers_is_an_error() {
        let result = Pipeline::<i32>::with_workers(0..10, |x| x, 0);
        assert!(matches!(result, Err(Error::NoWorkers)));
    }

    #[test]
    fn single_worker_preserves_input_order() {
        let pipeline = Pipeline::with_workers(0..9, |x: i32| x + 1, 1).unwrap();
        let out: Vec<i32> = pipeline.iter().collect();
        assert_eq!(out, (1..=9).collect::<Vec<_>>());
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let pipeline = Pipeline::new(std::iter::empty::<i32>(), |x| x);
        assert_eq!(pipeline.iter().next(), None);
    }

    #[test]
    fn single_input_yields_single_output() {
        let pipeline = Pipeline::new(std::iter::once(21), |x: i32| x * 2);
        let out: Vec<i32> = pipeline.iter().collect();
        assert_eq!(out, vec![42]);
    }

    #[test]
    fn owned_iteration_consumes_the_pipeline() {
        let pipeline = Pipeline::new(0..100, |x: i64| x + 1);
        let sum: i64 = pipeline.into_iter().sum();
        assert_eq!(sum, 5050);
    }

    #[test]
    fn pop_drains_the_output() {
        let pipeline = Pipeline::with_workers(0..3, |x: i32| x, 1).unwrap();
        let mut seen = Vec::new();
        while let Some(v) = pipeline.pop() {
            seen.push(v);
        }
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2]);
    }

    #[test]
    fn transform_panic_still_closes_the_output() {
        let pipeline = Pipeline::with_workers(
            0..10i64,
            |x| {
                if x == 3 {
                    panic!("bad item");
                }
                x
            },
            2,
        )
        .unwrap();
        // The panicking worker unwinds, but its executor reference drops
        // with it, so the output still closes and iteration terminates
        // with the nine surviving items.
        let count = pipeline.iter().count();
        assert_eq!(count, 9);
    }

    #[test]
    fn metrics_count_processed_items() {
        let pipeline = Pipeline::new(0..50, |x: i64| x);
        let drained: Vec<i64> = pipeline.iter().collect();
        assert_eq!(drained.len(), 50);
        assert_eq!(pipeline.metrics().total_processed(), 50);
    }
}
