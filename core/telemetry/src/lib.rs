//! Scheduler Telemetry
//!
//! Counters mutated by worker threads during a run, and the post-run
//! reductions (fairness, latency histogram) computed from them.

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

mod fairness;
mod histogram;

pub use fairness::FairnessReport;
pub use histogram::LatencyHistogram;

/// Run-wide counters, updated concurrently by every worker
#[derive(Debug, Default)]
pub struct MetricsAggregate {
    tasks_completed: AtomicU64,
    total_exec_ns: AtomicU64,
    idle_ns: AtomicU64,
    queue_accesses: AtomicU64,
}

impl MetricsAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one finished task and its execution time
    pub fn record_completion(&self, exec: Duration) {
        self.total_exec_ns
            .fetch_add(duration_ns(exec), Ordering::Relaxed);
        self.tasks_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record time a worker spent alive but not executing a task
    pub fn record_idle(&self, idle: Duration) {
        self.idle_ns.fetch_add(duration_ns(idle), Ordering::Relaxed);
    }

    /// Record one claim against a shared cursor
    pub fn record_queue_access(&self) {
        self.queue_accesses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn tasks_completed(&self) -> u64 {
        self.tasks_completed.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            tasks_completed: self.tasks_completed.load(Ordering::Acquire),
            total_exec_time: Duration::from_nanos(self.total_exec_ns.load(Ordering::Acquire)),
            idle_time: Duration::from_nanos(self.idle_ns.load(Ordering::Acquire)),
            queue_accesses: self.queue_accesses.load(Ordering::Acquire),
        }
    }
}

/// Plain copy of the aggregate, taken after the run barrier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub tasks_completed: u64,
    pub total_exec_time: Duration,
    pub idle_time: Duration,
    pub queue_accesses: u64,
}

impl MetricsSnapshot {
    pub fn avg_exec_time_ms(&self) -> f64 {
        if self.tasks_completed == 0 {
            return 0.0;
        }
        millis(self.total_exec_time) / self.tasks_completed as f64
    }

    /// Fraction of worker time spent idle, in [0, 1]
    pub fn idle_ratio(&self) -> f64 {
        let total = self.total_exec_time + self.idle_time;
        if total.is_zero() {
            return 0.0;
        }
        self.idle_time.as_secs_f64() / total.as_secs_f64()
    }

    /// Fraction of worker time spent executing tasks, in [0, 1]
    pub fn efficiency(&self) -> f64 {
        let total = self.total_exec_time + self.idle_time;
        if total.is_zero() {
            return 0.0;
        }
        self.total_exec_time.as_secs_f64() / total.as_secs_f64()
    }

    /// Completed tasks per second over a wall-clock duration
    pub fn throughput(&self, duration_secs: f64) -> f64 {
        if duration_secs <= 0.0 {
            return 0.0;
        }
        self.tasks_completed as f64 / duration_secs
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Tasks Completed: {}", self.tasks_completed)?;
        writeln!(f, "Total Execution Time: {:.2} ms", millis(self.total_exec_time))?;
        write!(f, "Avg Task Time: {:.3} ms", self.avg_exec_time_ms())
    }
}

/// Per-worker completion counts; slot `i` is only written by worker `i`
#[derive(Debug)]
pub struct WorkerCounters {
    slots: Box<[AtomicU64]>,
}

impl WorkerCounters {
    pub fn new(workers: usize) -> Self {
        Self {
            slots: (0..workers).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    pub fn record(&self, worker: usize) {
        self.slots[worker].fetch_add(1, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn counts(&self) -> Vec<u64> {
        self.slots.iter().map(|s| s.load(Ordering::Acquire)).collect()
    }

    pub fn total(&self) -> u64 {
        self.slots.iter().map(|s| s.load(Ordering::Acquire)).sum()
    }
}

/// Per-task execution latency, indexed by task id
#[derive(Debug)]
pub struct LatencySamples {
    nanos: Box<[AtomicU64]>,
}

impl LatencySamples {
    pub fn new(tasks: usize) -> Self {
        Self {
            nanos: (0..tasks).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    /// Store the latency of task `id`; each slot is written once per run
    pub fn record(&self, id: usize, latency: Duration) {
        self.nanos[id].store(duration_ns(latency), Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.nanos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nanos.is_empty()
    }

    pub fn get(&self, id: usize) -> Option<Duration> {
        self.nanos
            .get(id)
            .map(|n| Duration::from_nanos(n.load(Ordering::Acquire)))
    }

    /// Latencies in milliseconds, in task id order
    pub fn as_millis(&self) -> Vec<f64> {
        self.nanos
            .iter()
            .map(|n| n.load(Ordering::Acquire) as f64 / 1e6)
            .collect()
    }
}

fn duration_ns(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1e3
}
