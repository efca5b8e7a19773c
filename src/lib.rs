//! Parallel streaming pipelines: ordered stages of worker threads
//! connected by lazy coordination queues.
//!
//! Each stage applies a transform to items drawn from a shared input and
//! feeds its output queue; consumers iterate the terminal stage lazily
//! while upstream stages are still producing. Termination needs no item
//! counting: a queue closes by itself when its last writer handle drops.
//!
//! # Features
//!
//! - Unbounded MPMC queues with writer reference counting for
//!   end-of-stream detection
//! - Lazy single-pass consuming iterators that interoperate with blocking
//!   producers
//! - Per-stage worker teams, or a shared thread pool that cooperatively
//!   multiplexes pipelines deeper than the pool is wide
//! - `(index, step)` tagging for consumers that need provenance across
//!   out-of-order stage outputs
//! - Per-stage metrics: items processed, throughput, mean step latency
//!
//! # Example
//!
//! ```
//! use parastream::Pipeline;
//!
//! let squares = Pipeline::new(1..=3, |x: i32| x * x);
//! let mut out: Vec<i32> = squares.iter().collect();
//! out.sort_unstable();
//! assert_eq!(out, vec![1, 4, 9]);
//! ```

pub mod error;
pub mod indexed;
pub mod metrics;
pub mod pipeline;
pub mod pool;
pub mod queue;
pub mod stage;

// Re-exports for convenience
pub use error::{Error, Result};
pub use indexed::{indexed, indexed_fn, Indexed, IndexedIter};
pub use metrics::StageMetrics;
pub use pipeline::{Pipeline, PipelineIter};
pub use pool::ThreadPool;
pub use queue::{StreamIter, StreamQueue, Writer};
pub use stage::StageExecutor;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
