//! Load-balance statistics over per-worker completion counts.

use serde::Serialize;

/// Summary of how evenly tasks were spread across workers
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FairnessReport {
    pub min: u64,
    pub max: u64,
    pub mean: f64,
    /// Population standard deviation
    pub sd: f64,
    /// `100 * min / mean`, or 0 when the mean is 0
    pub fairness: f64,
}

impl FairnessReport {
    /// An empty slice yields an all-zero report.
    pub fn from_counts(counts: &[u64]) -> Self {
        let (Some(&min), Some(&max)) = (counts.iter().min(), counts.iter().max()) else {
            return Self {
                min: 0,
                max: 0,
                mean: 0.0,
                sd: 0.0,
                fairness: 0.0,
            };
        };

        let n = counts.len() as f64;
        let mean = counts.iter().sum::<u64>() as f64 / n;
        let var = counts
            .iter()
            .map(|&c| (c as f64 - mean).powi(2))
            .sum::<f64>()
            / n;
        let fairness = if mean > 0.0 {
            100.0 * min as f64 / mean
        } else {
            0.0
        };

        Self {
            min,
            max,
            mean,
            sd: var.sqrt(),
            fairness,
        }
    }
}
