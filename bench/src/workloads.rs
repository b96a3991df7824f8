//! Workload generators and compute kernels.
//!
//! Kernels are opaque busy-work; the scheduler only sees their weight.

use std::fmt;
use std::hint::black_box;
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, OnceLock};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sched::{SchedError, TaskQueue, TaskWeight};

use crate::config::{BenchConfig, ConfigError};

/// Reduction arrays are split into about this many chunk tasks
pub const REDUCTION_CHUNKS: usize = 100;

const MATRIX_A: f64 = 1.5;
const MATRIX_B: f64 = 2.0;

pub fn light_kernel() {
    let mut sum = 0i64;
    for i in 0..1_000 {
        sum = black_box(sum + i);
    }
    black_box(sum);
}

pub fn medium_kernel() {
    let mut sum = 0.0f64;
    for i in 0..10_000 {
        sum = black_box(sum + (i as f64).sqrt());
    }
    black_box(sum);
}

pub fn heavy_kernel() {
    let mut sum = 0.0f64;
    for i in 0..100_000 {
        let x = i as f64;
        sum = black_box(sum + x.sin() * x.cos());
    }
    black_box(sum);
}

/// Busy-work body for a weight class
pub fn kernel(weight: TaskWeight) {
    match weight {
        TaskWeight::Light => light_kernel(),
        TaskWeight::Medium => medium_kernel(),
        TaskWeight::Heavy => heavy_kernel(),
    }
}

/// Light, medium, heavy, light, ... for `n` tasks
pub fn generate_mixed(queue: &mut TaskQueue, n: usize) -> Result<(), SchedError> {
    for i in 0..n {
        let weight = TaskWeight::from_index(i);
        queue.submit(move || kernel(weight), weight)?;
    }
    Ok(())
}

/// Seeded random weights: 60% light, 30% medium, 10% heavy
pub fn generate_skewed(queue: &mut TaskQueue, n: usize, seed: u64) -> Result<(), SchedError> {
    let mut rng = StdRng::seed_from_u64(seed);
    for _ in 0..n {
        let weight = match rng.gen_range(0..10) {
            0..=5 => TaskWeight::Light,
            6..=8 => TaskWeight::Medium,
            _ => TaskWeight::Heavy,
        };
        queue.submit(move || kernel(weight), weight)?;
    }
    Ok(())
}

/// Output matrix of a row-parallel product; each row is written once
#[derive(Debug, Clone)]
pub struct MatrixProduct {
    size: usize,
    rows: Arc<[OnceLock<Vec<f64>>]>,
}

impl MatrixProduct {
    pub fn row(&self, i: usize) -> Option<&[f64]> {
        self.rows.get(i)?.get().map(Vec::as_slice)
    }

    /// Every cell of A×B when A and B are constant
    pub fn expected_cell(&self) -> f64 {
        MATRIX_A * MATRIX_B * self.size as f64
    }

    pub fn verify(&self) -> Result<(), String> {
        let expected = self.expected_cell();
        for i in 0..self.size {
            let row = self.row(i).ok_or_else(|| format!("row {} never computed", i))?;
            if let Some(j) = row.iter().position(|&c| (c - expected).abs() > 1e-9) {
                return Err(format!("C[{}][{}] = {}, expected {}", i, j, row[j], expected));
            }
        }
        Ok(())
    }
}

/// One heavy task per row of C = A×B, with A = 1.5 and B = 2.0 everywhere
pub fn generate_matrix(queue: &mut TaskQueue, size: usize) -> Result<MatrixProduct, SchedError> {
    let a: Arc<Vec<f64>> = Arc::new(vec![MATRIX_A; size * size]);
    let b: Arc<Vec<f64>> = Arc::new(vec![MATRIX_B; size * size]);
    let product = MatrixProduct {
        size,
        rows: (0..size).map(|_| OnceLock::new()).collect(),
    };

    for row in 0..size {
        let a = Arc::clone(&a);
        let b = Arc::clone(&b);
        let rows = Arc::clone(&product.rows);
        queue.submit(
            move || {
                let out: Vec<f64> = (0..size)
                    .map(|j| (0..size).map(|k| a[row * size + k] * b[k * size + j]).sum())
                    .collect();
                // Each row index is submitted once, so the cell is empty here
                let _ = rows[row].set(out);
            },
            TaskWeight::Heavy,
        )?;
    }
    Ok(product)
}

/// Shared accumulator of a chunked array sum
#[derive(Debug, Clone)]
pub struct Reduction {
    result: Arc<AtomicI64>,
    expected: i64,
}

impl Reduction {
    pub fn result(&self) -> i64 {
        self.result.load(Ordering::Acquire)
    }

    pub fn verify(&self) -> Result<(), String> {
        let got = self.result();
        if got == self.expected {
            Ok(())
        } else {
            Err(format!("reduction sum {}, expected {}", got, self.expected))
        }
    }
}

fn reduction_chunk(array_size: usize) -> usize {
    (array_size / REDUCTION_CHUNKS).max(1)
}

pub fn reduction_task_count(array_size: usize) -> usize {
    array_size.div_ceil(reduction_chunk(array_size))
}

/// Sum an array of ones with one light task per chunk
pub fn generate_reduction(
    queue: &mut TaskQueue,
    array_size: usize,
) -> Result<Reduction, SchedError> {
    let array: Arc<Vec<i64>> = Arc::new(vec![1; array_size]);
    let result = Arc::new(AtomicI64::new(0));
    let chunk = reduction_chunk(array_size);

    for start in (0..array_size).step_by(chunk) {
        let end = (start + chunk).min(array_size);
        let array = Arc::clone(&array);
        let result = Arc::clone(&result);
        queue.submit(
            move || {
                let sum: i64 = array[start..end].iter().sum();
                result.fetch_add(sum, Ordering::AcqRel);
            },
            TaskWeight::Light,
        )?;
    }

    Ok(Reduction {
        result,
        expected: array_size as i64,
    })
}

/// Named workload the harness can build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Workload {
    Mixed,
    Matrix,
    Reduction,
    Skewed,
}

impl Workload {
    pub fn name(self) -> &'static str {
        match self {
            Workload::Mixed => "mixed",
            Workload::Matrix => "matrix",
            Workload::Reduction => "reduction",
            Workload::Skewed => "skewed",
        }
    }

    /// Number of tasks `populate` will submit
    pub fn task_count(self, config: &BenchConfig) -> usize {
        match self {
            Workload::Mixed | Workload::Skewed => config.num_tasks,
            Workload::Matrix => config.matrix_size,
            Workload::Reduction => reduction_task_count(config.reduction_size),
        }
    }

    /// Fill `queue` and return what to verify after the run
    pub fn populate(
        self,
        queue: &mut TaskQueue,
        config: &BenchConfig,
    ) -> Result<WorkloadCheck, SchedError> {
        let check = match self {
            Workload::Mixed => {
                generate_mixed(queue, config.num_tasks)?;
                WorkloadCheck::None
            }
            Workload::Skewed => {
                generate_skewed(queue, config.num_tasks, config.seed)?;
                WorkloadCheck::None
            }
            Workload::Matrix => WorkloadCheck::Matrix(generate_matrix(queue, config.matrix_size)?),
            Workload::Reduction => {
                WorkloadCheck::Reduction(generate_reduction(queue, config.reduction_size)?)
            }
        };
        Ok(check)
    }
}

impl fmt::Display for Workload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Workload {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mixed" => Ok(Workload::Mixed),
            "matrix" => Ok(Workload::Matrix),
            "reduction" => Ok(Workload::Reduction),
            "skewed" => Ok(Workload::Skewed),
            _ => Err(ConfigError::UnknownWorkload(s.to_string())),
        }
    }
}

/// Post-run result check for workloads that produce a value
#[derive(Debug, Clone)]
pub enum WorkloadCheck {
    None,
    Matrix(MatrixProduct),
    Reduction(Reduction),
}

impl WorkloadCheck {
    pub fn verify(&self) -> Result<(), String> {
        match self {
            WorkloadCheck::None => Ok(()),
            WorkloadCheck::Matrix(m) => m.verify(),
            WorkloadCheck::Reduction(r) => r.verify(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sched::{ScheduleMode, Scheduler, SchedulerConfig};

    fn run(queue: TaskQueue, threads: usize, mode: ScheduleMode) {
        let mut sched = Scheduler::new(queue, SchedulerConfig::new(threads, mode)).unwrap();
        sched.run().unwrap();
    }

    #[test]
    fn test_mixed_round_robin() {
        let mut queue = TaskQueue::with_capacity(7);
        generate_mixed(&mut queue, 7).unwrap();
        assert_eq!(queue.snapshot().weight_counts(), [3, 2, 2]);
    }

    #[test]
    fn test_mixed_over_capacity() {
        let mut queue = TaskQueue::with_capacity(5);
        assert!(matches!(
            generate_mixed(&mut queue, 6),
            Err(SchedError::Capacity { capacity: 5 })
        ));
    }

    #[test]
    fn test_skewed_is_seeded() {
        let weights = |seed| {
            let mut queue = TaskQueue::with_capacity(200);
            generate_skewed(&mut queue, 200, seed).unwrap();
            queue.snapshot().iter().map(|(_, w)| w).collect::<Vec<_>>()
        };
        assert_eq!(weights(7), weights(7));

        let mut queue = TaskQueue::with_capacity(1000);
        generate_skewed(&mut queue, 1000, 7).unwrap();
        let [light, medium, heavy] = queue.snapshot().weight_counts();
        assert!(light > medium && medium > heavy);
    }

    #[test]
    fn test_matrix_product() {
        for mode in ScheduleMode::ALL {
            let mut queue = TaskQueue::with_capacity(12);
            let product = generate_matrix(&mut queue, 12).unwrap();
            assert_eq!(queue.len(), 12);
            assert!(product.verify().is_err());

            run(queue, 3, mode);
            product.verify().unwrap();
            assert_eq!(product.row(0).unwrap()[11], 36.0);
        }
    }

    #[test]
    fn test_reduction_of_ones() {
        for mode in ScheduleMode::ALL {
            for threads in [1, 4] {
                let mut queue = TaskQueue::with_capacity(reduction_task_count(1000));
                let reduction = generate_reduction(&mut queue, 1000).unwrap();
                assert_eq!(queue.len(), 100);

                run(queue, threads, mode);
                assert_eq!(reduction.result(), 1000);
                reduction.verify().unwrap();
            }
        }
    }

    #[test]
    fn test_reduction_small_and_ragged() {
        assert_eq!(reduction_task_count(50), 50);
        assert_eq!(reduction_task_count(1050), 105);
        assert_eq!(reduction_task_count(0), 0);

        let mut queue = TaskQueue::with_capacity(reduction_task_count(1050));
        let reduction = generate_reduction(&mut queue, 1050).unwrap();
        run(queue, 2, ScheduleMode::Guided);
        assert_eq!(reduction.result(), 1050);
    }

    #[test]
    fn test_workload_names() {
        for w in [Workload::Mixed, Workload::Matrix, Workload::Reduction, Workload::Skewed] {
            assert_eq!(w.name().parse::<Workload>().unwrap(), w);
        }
        assert!("fft".parse::<Workload>().is_err());
    }
}
