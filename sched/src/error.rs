use std::collections::TryReserveError;
use std::io;

/// Errors surfaced by queue submission and scheduler runs.
#[derive(Debug, thiserror::Error)]
pub enum SchedError {
    #[error("task queue is full (capacity {capacity})")]
    Capacity { capacity: usize },
    #[error("failed to allocate {requested} task slots: {source}")]
    Allocation {
        requested: usize,
        #[source]
        source: TryReserveError,
    },
    #[error("worker count must be at least 1")]
    InvalidThreadCount,
    #[error("failed to spawn worker {worker}: {source}")]
    Spawn {
        worker: usize,
        #[source]
        source: io::Error,
    },
    #[error("task batch already consumed by a previous run")]
    BatchConsumed,
    #[error("run aborted before every task completed")]
    Aborted,
    #[error("unknown schedule mode: {0}")]
    UnknownMode(String),
}
