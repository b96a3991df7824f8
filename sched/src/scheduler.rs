//! Scheduler: owns one task batch and the counters for its single run.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use telemetry::{
    FairnessReport, LatencyHistogram, LatencySamples, MetricsAggregate, MetricsSnapshot,
    WorkerCounters,
};
use tracing::{debug, info, warn};

use crate::error::SchedError;
use crate::mode::ScheduleMode;
use crate::policy;
use crate::queue::{QueueSnapshot, TaskQueue};
use crate::task::Task;

/// Sleep between polls of the outstanding-task counter
pub const WAIT_POLL_INTERVAL: Duration = Duration::from_micros(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub num_threads: usize,
    pub mode: ScheduleMode,
}

impl SchedulerConfig {
    pub fn new(num_threads: usize, mode: ScheduleMode) -> Self {
        Self { num_threads, mode }
    }
}

/// Result of one completed run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub mode: ScheduleMode,
    pub threads: usize,
    pub tasks: usize,
    pub elapsed: Duration,
    pub metrics: MetricsSnapshot,
}

impl RunReport {
    pub fn duration_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    pub fn throughput(&self) -> f64 {
        self.metrics.throughput(self.duration_secs())
    }
}

/// Cloneable handle for waiting on a run from another thread
#[derive(Debug, Clone)]
pub struct CompletionHandle {
    outstanding: Arc<AtomicUsize>,
    aborted: Arc<AtomicBool>,
}

impl CompletionHandle {
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    pub fn is_complete(&self) -> bool {
        self.outstanding() == 0
    }

    /// Set once a run returned an error or unwound from a task panic
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }

    /// Busy-wait until every submitted task has completed, or the run aborts.
    ///
    /// Tasks that never ran stay outstanding after an abort, so the wait
    /// ends with [`SchedError::Aborted`] instead.
    pub fn wait(&self) -> Result<(), SchedError> {
        loop {
            if self.is_complete() {
                return Ok(());
            }
            if self.is_aborted() {
                return Err(SchedError::Aborted);
            }
            thread::sleep(WAIT_POLL_INTERVAL);
        }
    }
}

/// Marks the run aborted when dropped without [`AbortGuard::disarm`],
/// covering both error returns and unwinding.
struct AbortGuard<'a> {
    aborted: &'a AtomicBool,
    armed: bool,
}

impl<'a> AbortGuard<'a> {
    fn new(aborted: &'a AtomicBool) -> Self {
        Self { aborted, armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for AbortGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.aborted.store(true, Ordering::Release);
            warn!("Scheduler run aborted");
        }
    }
}

/// Runs a [`TaskQueue`] once under a fixed [`ScheduleMode`].
pub struct Scheduler {
    config: SchedulerConfig,
    queue: TaskQueue,
    task_count: usize,
    metrics: MetricsAggregate,
    workers: WorkerCounters,
    latencies: LatencySamples,
    outstanding: Arc<AtomicUsize>,
    aborted: Arc<AtomicBool>,
    consumed: bool,
}

impl Scheduler {
    pub fn new(queue: TaskQueue, config: SchedulerConfig) -> Result<Self, SchedError> {
        if config.num_threads == 0 {
            return Err(SchedError::InvalidThreadCount);
        }

        let task_count = queue.len();
        Ok(Self {
            config,
            queue,
            task_count,
            metrics: MetricsAggregate::new(),
            workers: WorkerCounters::new(config.num_threads),
            latencies: LatencySamples::new(task_count),
            outstanding: Arc::new(AtomicUsize::new(task_count)),
            aborted: Arc::new(AtomicBool::new(false)),
            consumed: false,
        })
    }

    pub fn config(&self) -> SchedulerConfig {
        self.config
    }

    pub fn mode(&self) -> ScheduleMode {
        self.config.mode
    }

    pub fn num_threads(&self) -> usize {
        self.config.num_threads
    }

    pub fn task_count(&self) -> usize {
        self.task_count
    }

    /// Tasks still queued; empty once the batch has run
    pub fn queue(&self) -> QueueSnapshot<'_> {
        self.queue.snapshot()
    }

    pub fn completion_handle(&self) -> CompletionHandle {
        CompletionHandle {
            outstanding: Arc::clone(&self.outstanding),
            aborted: Arc::clone(&self.aborted),
        }
    }

    /// Execute every queued task and block until all have completed.
    ///
    /// The batch is consumed; a second call fails with
    /// [`SchedError::BatchConsumed`]. If the run fails or a task panics,
    /// waiters on a [`CompletionHandle`] are released with
    /// [`SchedError::Aborted`].
    pub fn run(&mut self) -> Result<RunReport, SchedError> {
        if self.consumed {
            return Err(SchedError::BatchConsumed);
        }
        self.consumed = true;

        let SchedulerConfig { num_threads, mode } = self.config;
        let tasks = self.queue.take_tasks();
        let guard = AbortGuard::new(&self.aborted);
        info!(
            "Scheduler run starting: mode={}, {} workers, {} tasks",
            mode, num_threads, self.task_count
        );

        let ctx = RunContext::new(&self.metrics, &self.workers, &self.latencies, &self.outstanding);

        let started = Instant::now();
        match mode {
            ScheduleMode::Static => policy::run_static(&ctx, tasks, num_threads)?,
            ScheduleMode::Dynamic => policy::run_dynamic(&ctx, tasks, num_threads)?,
            ScheduleMode::Guided => policy::run_guided(&ctx, tasks, num_threads)?,
            ScheduleMode::Heterogeneous => policy::run_heterogeneous(&ctx, tasks, num_threads)?,
        }
        let elapsed = started.elapsed();
        guard.disarm();

        let metrics = self.metrics.snapshot();
        info!(
            "Scheduler run finished: mode={}, {} tasks in {:?}",
            mode, metrics.tasks_completed, elapsed
        );

        Ok(RunReport {
            mode,
            threads: num_threads,
            tasks: self.task_count,
            elapsed,
            metrics,
        })
    }

    /// Block until no submitted task is outstanding
    pub fn wait(&self) -> Result<(), SchedError> {
        self.completion_handle().wait()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn worker_counts(&self) -> Vec<u64> {
        self.workers.counts()
    }

    /// Per-task latency in milliseconds, indexed by task id
    pub fn latencies_ms(&self) -> Vec<f64> {
        self.latencies.as_millis()
    }

    pub fn fairness(&self) -> FairnessReport {
        FairnessReport::from_counts(&self.workers.counts())
    }

    pub fn latency_histogram(&self) -> LatencyHistogram {
        LatencyHistogram::from_samples(&self.latencies.as_millis())
    }

    /// Completed tasks per second over `duration_secs`
    pub fn throughput(&self, duration_secs: f64) -> f64 {
        self.metrics.snapshot().throughput(duration_secs)
    }

    /// Busy time over busy plus idle time, in [0, 1]
    pub fn efficiency(&self) -> f64 {
        self.metrics.snapshot().efficiency()
    }
}

/// Counters shared by all workers of one run
pub(crate) struct RunContext<'a> {
    pub(crate) metrics: &'a MetricsAggregate,
    workers: &'a WorkerCounters,
    latencies: &'a LatencySamples,
    outstanding: &'a AtomicUsize,
}

impl<'a> RunContext<'a> {
    pub(crate) fn new(
        metrics: &'a MetricsAggregate,
        workers: &'a WorkerCounters,
        latencies: &'a LatencySamples,
        outstanding: &'a AtomicUsize,
    ) -> Self {
        Self {
            metrics,
            workers,
            latencies,
            outstanding,
        }
    }

    pub(crate) fn start_worker(&self, worker: usize) -> WorkerClock<'_, 'a> {
        WorkerClock {
            ctx: self,
            worker,
            started: Instant::now(),
            busy: Duration::ZERO,
            completed: 0,
        }
    }
}

/// Per-worker bookkeeping; idle time is recorded when the worker finishes
pub(crate) struct WorkerClock<'c, 'a> {
    ctx: &'c RunContext<'a>,
    worker: usize,
    started: Instant,
    busy: Duration,
    completed: u64,
}

impl WorkerClock<'_, '_> {
    /// Execute one task and record its latency and completion
    pub(crate) fn run(&mut self, task: Task) {
        let id = task.id().index();
        let start = Instant::now();
        task.execute();
        let exec = start.elapsed();

        self.ctx.latencies.record(id, exec);
        self.ctx.metrics.record_completion(exec);
        self.ctx.workers.record(self.worker);
        self.ctx.outstanding.fetch_sub(1, Ordering::AcqRel);

        self.busy += exec;
        self.completed += 1;
    }
}

impl Drop for WorkerClock<'_, '_> {
    fn drop(&mut self) {
        let wall = self.started.elapsed();
        self.ctx.metrics.record_idle(wall.saturating_sub(self.busy));
        debug!(
            "Worker {} finished: {} tasks, busy {:?} of {:?}",
            self.worker, self.completed, self.busy, wall
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskWeight;
    use std::sync::atomic::AtomicU64;

    fn counting_queue(n: usize, counter: &Arc<AtomicU64>) -> TaskQueue {
        let mut queue = TaskQueue::with_capacity(n);
        for i in 0..n {
            let counter = Arc::clone(counter);
            queue
                .submit(
                    move || {
                        counter.fetch_add(1, Ordering::Relaxed);
                    },
                    TaskWeight::from_index(i),
                )
                .unwrap();
        }
        queue
    }

    fn counting_scheduler(
        n: usize,
        counter: &Arc<AtomicU64>,
        threads: usize,
        mode: ScheduleMode,
    ) -> Scheduler {
        Scheduler::new(counting_queue(n, counter), SchedulerConfig::new(threads, mode)).unwrap()
    }

    #[test]
    fn test_zero_threads_rejected() {
        let queue = TaskQueue::with_capacity(1);
        let err = Scheduler::new(queue, SchedulerConfig::new(0, ScheduleMode::Static));
        assert!(matches!(err, Err(SchedError::InvalidThreadCount)));
    }

    #[test]
    fn test_every_mode_completes_batch() {
        for mode in ScheduleMode::ALL {
            for threads in [1, 2, 3, 8] {
                let counter = Arc::new(AtomicU64::new(0));
                let queue = counting_queue(37, &counter);
                let mut sched =
                    Scheduler::new(queue, SchedulerConfig::new(threads, mode)).unwrap();

                let report = sched.run().unwrap();
                sched.wait().unwrap();

                assert_eq!(counter.load(Ordering::Relaxed), 37, "{} x{}", mode, threads);
                assert_eq!(report.metrics.tasks_completed, 37);
                assert_eq!(sched.worker_counts().len(), threads);
                assert_eq!(sched.worker_counts().iter().sum::<u64>(), 37);
                assert_eq!(sched.latency_histogram().total(), 37);
                assert!(sched.queue().is_empty());
            }
        }
    }

    #[test]
    fn test_second_run_rejected() {
        let counter = Arc::new(AtomicU64::new(0));
        let mut sched = counting_scheduler(4, &counter, 2, ScheduleMode::Dynamic);
        sched.run().unwrap();
        assert!(matches!(sched.run(), Err(SchedError::BatchConsumed)));
        assert!(sched.wait().is_ok());
        assert_eq!(counter.load(Ordering::Relaxed), 4);
    }

    #[test]
    fn test_empty_batch() {
        let mut sched = Scheduler::new(
            TaskQueue::with_capacity(0),
            SchedulerConfig::new(4, ScheduleMode::Heterogeneous),
        )
        .unwrap();
        let report = sched.run().unwrap();
        assert_eq!(report.metrics.tasks_completed, 0);
        assert_eq!(sched.worker_counts(), vec![0; 4]);
        assert_eq!(sched.fairness().fairness, 0.0);
        assert!(sched.completion_handle().is_complete());
    }

    #[test]
    fn test_static_counts_follow_partition() {
        let counter = Arc::new(AtomicU64::new(0));
        let mut sched = counting_scheduler(10, &counter, 4, ScheduleMode::Static);
        let report = sched.run().unwrap();

        assert_eq!(sched.worker_counts(), vec![3, 3, 3, 1]);
        // Static never touches a shared cursor
        assert_eq!(report.metrics.queue_accesses, 0);
    }

    #[test]
    fn test_claims_counted() {
        let counter = Arc::new(AtomicU64::new(0));
        let mut dynamic = counting_scheduler(50, &counter, 3, ScheduleMode::Dynamic);
        assert_eq!(dynamic.run().unwrap().metrics.queue_accesses, 50);

        let mut guided = counting_scheduler(50, &counter, 3, ScheduleMode::Guided);
        let claims = guided.run().unwrap().metrics.queue_accesses;
        assert_eq!(claims as usize, policy::guided_schedule(50, 3).len());
    }

    #[test]
    fn test_outstanding_reaches_zero() {
        let counter = Arc::new(AtomicU64::new(0));
        let mut sched = counting_scheduler(12, &counter, 2, ScheduleMode::Guided);
        let handle = sched.completion_handle();
        assert_eq!(handle.outstanding(), 12);

        let runner = thread::spawn(move || {
            sched.run().unwrap();
            sched
        });
        handle.wait().unwrap();
        let sched = runner.join().unwrap();

        assert_eq!(handle.outstanding(), 0);
        assert!(!handle.is_aborted());
        assert_eq!(sched.metrics().tasks_completed, 12);
    }

    #[test]
    fn test_waiters_released_when_run_unwinds() {
        let mut queue = TaskQueue::with_capacity(6);
        for i in 0..6 {
            queue
                .submit(
                    move || {
                        if i == 0 {
                            panic!("task {} failed", i);
                        }
                    },
                    TaskWeight::Light,
                )
                .unwrap();
        }
        let config = SchedulerConfig::new(1, ScheduleMode::Static);
        let mut sched = Scheduler::new(queue, config).unwrap();
        let handle = sched.completion_handle();

        let waiter = {
            let handle = handle.clone();
            thread::spawn(move || handle.wait())
        };
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| sched.run()));
        assert!(result.is_err());

        assert!(handle.is_aborted());
        assert!(!handle.is_complete());
        assert!(matches!(waiter.join().unwrap(), Err(SchedError::Aborted)));
        assert!(matches!(sched.wait(), Err(SchedError::Aborted)));
    }

    #[test]
    fn test_efficiency_in_unit_range() {
        let counter = Arc::new(AtomicU64::new(0));
        let mut sched = counting_scheduler(20, &counter, 2, ScheduleMode::Static);
        let report = sched.run().unwrap();
        let eff = sched.efficiency();
        assert!((0.0..=1.0).contains(&eff));
        assert!(report.throughput() > 0.0);
    }
}
