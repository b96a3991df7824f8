//! Lock-based reference comparator.
//!
//! The naive pattern every policy is measured against: a `next_index`
//! behind a mutex, claimed one at a time, with the task body chosen by
//! `index mod 3`. It does not go through [`Scheduler`](crate::Scheduler).

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use telemetry::{FairnessReport, LatencyHistogram, LatencySamples, WorkerCounters};
use tracing::info;

use crate::error::SchedError;
use crate::region::parallel_region;
use crate::task::TaskWeight;

#[derive(Debug, Clone)]
pub struct ReferenceReport {
    pub threads: usize,
    pub tasks: usize,
    pub elapsed: Duration,
    pub worker_counts: Vec<u64>,
    /// Milliseconds, indexed by task index
    pub latencies_ms: Vec<f64>,
}

impl ReferenceReport {
    pub fn duration_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    pub fn throughput(&self) -> f64 {
        let secs = self.duration_secs();
        if secs > 0.0 {
            self.tasks as f64 / secs
        } else {
            0.0
        }
    }

    pub fn fairness(&self) -> FairnessReport {
        FairnessReport::from_counts(&self.worker_counts)
    }

    pub fn histogram(&self) -> LatencyHistogram {
        LatencyHistogram::from_samples(&self.latencies_ms)
    }
}

/// Run `num_tasks` bodies on `num_threads` workers sharing a locked index.
///
/// `body` receives the weight class `TaskWeight::from_index(index)`.
pub fn run_lock_based<F>(
    num_threads: usize,
    num_tasks: usize,
    body: F,
) -> Result<ReferenceReport, SchedError>
where
    F: Fn(TaskWeight) + Sync,
{
    if num_threads == 0 {
        return Err(SchedError::InvalidThreadCount);
    }

    let next_index = Mutex::new(0usize);
    let counts = WorkerCounters::new(num_threads);
    let latencies = LatencySamples::new(num_tasks);

    let started = Instant::now();
    parallel_region(vec![(); num_threads], |worker, ()| loop {
        let index = {
            let mut next = next_index.lock().unwrap_or_else(PoisonError::into_inner);
            if *next >= num_tasks {
                break;
            }
            let index = *next;
            *next += 1;
            index
        };

        let start = Instant::now();
        body(TaskWeight::from_index(index));
        latencies.record(index, start.elapsed());
        counts.record(worker);
    })?;
    let elapsed = started.elapsed();

    info!(
        "Lock-based reference: {} tasks on {} workers in {:?}",
        num_tasks, num_threads, elapsed
    );

    Ok(ReferenceReport {
        threads: num_threads,
        tasks: num_tasks,
        elapsed,
        worker_counts: counts.counts(),
        latencies_ms: latencies.as_millis(),
    })
}
