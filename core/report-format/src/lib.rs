//! Benchmark Report Format
//!
//! CSV tables emitted by the benchmark driver.
//! Layout per table: `=== SECTION ===` line, header row, data rows.

use serde::{Serialize, Serializer};
use std::io::{self, Write};
use telemetry::{FairnessReport, LatencyHistogram};

pub const THROUGHPUT_SECTION_SUFFIX: &str = "_WORKLOAD_RESULTS";
pub const FAIRNESS_SECTION: &str = "PER_THREAD_FAIRNESS";
pub const HISTOGRAM_SECTION: &str = "TASK_LATENCY_HISTOGRAM";

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("report I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),
}

/// A row type with a fixed column header
pub trait CsvRow: Serialize {
    const HEADER: &'static [&'static str];
}

/// One (workload, mode, threads) timing result
#[derive(Debug, Clone, Serialize)]
pub struct ThroughputRow {
    pub workload: String,
    pub mode: String,
    pub threads: usize,
    #[serde(serialize_with = "fixed5")]
    pub duration_sec: f64,
    #[serde(serialize_with = "fixed2")]
    pub throughput: f64,
    #[serde(serialize_with = "fixed3")]
    pub speedup: f64,
    #[serde(serialize_with = "fixed2")]
    pub efficiency: f64,
}

impl ThroughputRow {
    /// Fills speedup and efficiency from a single-thread baseline duration.
    pub fn new(
        workload: &str,
        mode: &str,
        threads: usize,
        duration_sec: f64,
        tasks: usize,
        baseline_sec: f64,
    ) -> Self {
        let throughput = if duration_sec > 0.0 {
            tasks as f64 / duration_sec
        } else {
            0.0
        };
        let speedup = if duration_sec > 0.0 {
            baseline_sec / duration_sec
        } else {
            0.0
        };
        Self {
            workload: workload.to_string(),
            mode: mode.to_string(),
            threads,
            duration_sec,
            throughput,
            speedup,
            efficiency: 100.0 * speedup / threads.max(1) as f64,
        }
    }
}

impl CsvRow for ThroughputRow {
    const HEADER: &'static [&'static str] = &[
        "Workload",
        "Mode",
        "Threads",
        "Duration_sec",
        "Throughput",
        "Speedup",
        "Efficiency",
    ];
}

/// Load-balance summary for one (mode, threads) pair
#[derive(Debug, Clone, Serialize)]
pub struct FairnessRow {
    pub mode: String,
    pub threads: usize,
    pub min_tasks: u64,
    pub max_tasks: u64,
    #[serde(serialize_with = "fixed2")]
    pub mean_tasks: f64,
    #[serde(serialize_with = "fixed2")]
    pub sd_tasks: f64,
    #[serde(serialize_with = "fixed2")]
    pub fairness: f64,
}

impl FairnessRow {
    pub fn new(mode: &str, threads: usize, report: &FairnessReport) -> Self {
        Self {
            mode: mode.to_string(),
            threads,
            min_tasks: report.min,
            max_tasks: report.max,
            mean_tasks: report.mean,
            sd_tasks: report.sd,
            fairness: report.fairness,
        }
    }
}

impl CsvRow for FairnessRow {
    const HEADER: &'static [&'static str] = &[
        "Mode",
        "Threads",
        "MinTasks",
        "MaxTasks",
        "MeanTasks",
        "SD_Tasks",
        "Fairness",
    ];
}

/// Eight band counts serialized as one record
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct HistogramRow {
    pub bins: [u64; LatencyHistogram::BANDS],
}

impl From<&LatencyHistogram> for HistogramRow {
    fn from(hist: &LatencyHistogram) -> Self {
        Self { bins: hist.counts() }
    }
}

impl CsvRow for HistogramRow {
    const HEADER: &'static [&'static str] = &LatencyHistogram::LABELS;
}

/// Writes sectioned CSV tables to an output stream
pub struct ReportWriter<W: Write> {
    out: W,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Write `=== section ===`, the header, then every row.
    /// The header is written even when `rows` is empty.
    pub fn table<R: CsvRow>(&mut self, section: &str, rows: &[R]) -> Result<(), ReportError> {
        writeln!(self.out, "=== {} ===", section)?;

        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(&mut self.out);
        wtr.write_record(R::HEADER)?;
        for row in rows {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Section name for a workload's timing table, e.g. `MIXED_WORKLOAD_RESULTS`
pub fn throughput_section(workload: &str) -> String {
    format!("{}{}", workload.to_uppercase(), THROUGHPUT_SECTION_SUFFIX)
}

fn fixed2<S: Serializer>(v: &f64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format!("{:.2}", v))
}

fn fixed3<S: Serializer>(v: &f64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format!("{:.3}", v))
}

fn fixed5<S: Serializer>(v: &f64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format!("{:.5}", v))
}
