use thiserror::Error;

/// Result type for pipeline construction.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when wiring up a pipeline.
#[derive(Error, Debug)]
pub enum Error {
    /// A pipeline stage was asked for with zero worker threads
    #[error("a pipeline stage requires at least one worker thread")]
    NoWorkers,

    /// A thread pool was asked for with zero worker threads
    #[error("a thread pool requires at least one worker thread")]
    EmptyPool,
}
