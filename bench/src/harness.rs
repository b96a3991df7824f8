//! Benchmark harness.
//!
//! For every workload and thread count: one lock-based reference run (mixed
//! workload only) and one run per schedule mode. Speedup is relative to
//! the single-thread Static duration of the same workload.

use std::io::Write;

use report_format::{
    throughput_section, FairnessRow, HistogramRow, ReportError, ReportWriter, ThroughputRow,
    FAIRNESS_SECTION, HISTOGRAM_SECTION,
};
use sched::{run_lock_based, ScheduleMode, SchedError, Scheduler, SchedulerConfig, TaskQueue};
use telemetry::FairnessReport;
use tracing::{debug, info};

use crate::config::BenchConfig;
use crate::workloads::{kernel, Workload};

/// Report label of the lock-based reference
pub const LOCK_BASED: &str = "LOCK_BASED";

#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error(transparent)]
    Sched(#[from] SchedError),
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error("{workload} under {mode} with {threads} threads produced a wrong result: {detail}")]
    Verification {
        workload: Workload,
        mode: ScheduleMode,
        threads: usize,
        detail: String,
    },
}

/// Rendered-ready tables of one benchmark sweep
#[derive(Debug, Clone)]
pub struct BenchReport {
    /// (section name, rows) per workload
    pub throughput: Vec<(String, Vec<ThroughputRow>)>,
    pub fairness: Vec<FairnessRow>,
    pub histogram: HistogramRow,
}

impl BenchReport {
    pub fn write<W: Write>(&self, out: W) -> Result<(), ReportError> {
        let mut writer = ReportWriter::new(out);
        for (section, rows) in &self.throughput {
            writer.table(section, rows)?;
        }
        writer.table(FAIRNESS_SECTION, &self.fairness)?;
        writer.table(HISTOGRAM_SECTION, std::slice::from_ref(&self.histogram))?;
        Ok(())
    }
}

/// Timing and load of a single (mode, threads) run
#[derive(Debug, Clone)]
struct Measurement {
    label: &'static str,
    threads: usize,
    duration_secs: f64,
    tasks: usize,
    worker_counts: Vec<u64>,
}

pub struct Harness {
    config: BenchConfig,
}

impl Harness {
    pub fn new(config: BenchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    /// Run the full sweep. Fairness rows come from the first workload.
    pub fn run(&self) -> Result<BenchReport, HarnessError> {
        let mut throughput = Vec::with_capacity(self.config.workloads.len());
        let mut fairness = Vec::new();

        for (i, &workload) in self.config.workloads.iter().enumerate() {
            info!("Benchmarking {} workload", workload);
            let measurements = self.sweep(workload)?;

            let baseline = match measurements
                .iter()
                .find(|m| m.label == ScheduleMode::Static.label() && m.threads == 1)
            {
                Some(m) => m.duration_secs,
                None => self.measure(workload, ScheduleMode::Static, 1)?.duration_secs,
            };

            let rows = measurements
                .iter()
                .map(|m| {
                    ThroughputRow::new(
                        workload.name(),
                        m.label,
                        m.threads,
                        m.duration_secs,
                        m.tasks,
                        baseline,
                    )
                })
                .collect();
            throughput.push((throughput_section(workload.name()), rows));

            if i == 0 {
                fairness = fairness_rows(&measurements);
            }
        }

        let reference = run_lock_based(1, self.config.num_tasks, kernel)?;
        let histogram = HistogramRow::from(&reference.histogram());

        Ok(BenchReport {
            throughput,
            fairness,
            histogram,
        })
    }

    /// Every mode at every thread count, ordered by threads then mode
    fn sweep(&self, workload: Workload) -> Result<Vec<Measurement>, HarnessError> {
        let mut out = Vec::new();
        for &threads in &self.config.thread_counts {
            if workload == Workload::Mixed {
                let reference = run_lock_based(threads, self.config.num_tasks, kernel)?;
                out.push(Measurement {
                    label: LOCK_BASED,
                    threads,
                    duration_secs: reference.duration_secs(),
                    tasks: reference.tasks,
                    worker_counts: reference.worker_counts,
                });
            }
            for mode in ScheduleMode::ALL {
                out.push(self.measure(workload, mode, threads)?);
            }
        }
        Ok(out)
    }

    fn measure(
        &self,
        workload: Workload,
        mode: ScheduleMode,
        threads: usize,
    ) -> Result<Measurement, HarnessError> {
        let mut queue = TaskQueue::with_capacity(workload.task_count(&self.config));
        let check = workload.populate(&mut queue, &self.config)?;

        let mut sched = Scheduler::new(queue, SchedulerConfig::new(threads, mode))?;
        let report = sched.run()?;
        sched.wait()?;

        check.verify().map_err(|detail| HarnessError::Verification {
            workload,
            mode,
            threads,
            detail,
        })?;
        debug!(
            "{} {} x{}: {:.5}s, {}",
            workload,
            mode,
            threads,
            report.duration_secs(),
            report.metrics
        );

        Ok(Measurement {
            label: mode.label(),
            threads,
            duration_secs: report.duration_secs(),
            tasks: report.tasks,
            worker_counts: sched.worker_counts(),
        })
    }
}

/// Regroup by mode (in first-seen order), keeping thread order within a mode
fn fairness_rows(measurements: &[Measurement]) -> Vec<FairnessRow> {
    let mut labels: Vec<&str> = Vec::new();
    for m in measurements {
        if !labels.contains(&m.label) {
            labels.push(m.label);
        }
    }

    labels
        .iter()
        .flat_map(|&label| {
            measurements
                .iter()
                .filter(move |m| m.label == label)
                .map(|m| {
                    let report = FairnessReport::from_counts(&m.worker_counts);
                    FairnessRow::new(m.label, m.threads, &report)
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config(workloads: Vec<Workload>, threads: Vec<usize>) -> BenchConfig {
        BenchConfig {
            thread_counts: threads,
            num_tasks: 30,
            matrix_size: 8,
            reduction_size: 200,
            workloads,
            seed: 1,
        }
    }

    #[test]
    fn test_mixed_sweep_shape() {
        let report = Harness::new(small_config(vec![Workload::Mixed], vec![1, 2]))
            .run()
            .unwrap();

        let (section, rows) = &report.throughput[0];
        assert_eq!(section, "MIXED_WORKLOAD_RESULTS");
        let labels: Vec<(&str, usize)> =
            rows.iter().map(|r| (r.mode.as_str(), r.threads)).collect();
        assert_eq!(
            labels,
            vec![
                ("LOCK_BASED", 1),
                ("STATIC", 1),
                ("DYNAMIC", 1),
                ("GUIDED", 1),
                ("HETEROGENEOUS", 1),
                ("LOCK_BASED", 2),
                ("STATIC", 2),
                ("DYNAMIC", 2),
                ("GUIDED", 2),
                ("HETEROGENEOUS", 2),
            ]
        );

        // Static single-thread is its own baseline
        assert!((rows[1].speedup - 1.0).abs() < 1e-12);

        let fairness: Vec<(&str, usize)> = report
            .fairness
            .iter()
            .map(|r| (r.mode.as_str(), r.threads))
            .collect();
        assert_eq!(fairness[0], ("LOCK_BASED", 1));
        assert_eq!(fairness[1], ("LOCK_BASED", 2));
        assert_eq!(fairness[2], ("STATIC", 1));
        assert_eq!(fairness.len(), 10);
        assert!(report.fairness.iter().all(|r| r.min_tasks + r.max_tasks > 0));

        assert_eq!(report.histogram.bins.iter().sum::<u64>(), 30);
    }

    #[test]
    fn test_verified_workloads_without_single_thread() {
        let report = Harness::new(small_config(
            vec![Workload::Matrix, Workload::Reduction, Workload::Skewed],
            vec![3],
        ))
        .run()
        .unwrap();

        assert_eq!(report.throughput.len(), 3);
        for (_, rows) in &report.throughput {
            // No reference row outside the mixed workload
            assert_eq!(rows.len(), ScheduleMode::ALL.len());
            assert!(rows.iter().all(|r| r.speedup > 0.0 && r.threads == 3));
        }
        assert_eq!(report.fairness.len(), ScheduleMode::ALL.len());
    }

    #[test]
    fn test_report_renders_three_sections() {
        let report = Harness::new(small_config(vec![Workload::Reduction], vec![1]))
            .run()
            .unwrap();
        let mut out = Vec::new();
        report.write(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        let sections: Vec<&str> = text.lines().filter(|l| l.starts_with("===")).collect();
        assert_eq!(
            sections,
            vec![
                "=== REDUCTION_WORKLOAD_RESULTS ===",
                "=== PER_THREAD_FAIRNESS ===",
                "=== TASK_LATENCY_HISTOGRAM ===",
            ]
        );
        assert!(text.contains("reduction,STATIC,1,"));
    }
}
