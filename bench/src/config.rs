//! Benchmark configuration.
//!
//! Defaults reproduce the standard sweep. Each field can be overridden by
//! a `TASKBENCH_*` environment variable; there are no flags or files.

use std::env;
use std::str::FromStr;

use crate::workloads::Workload;

pub const ENV_TASKS: &str = "TASKBENCH_TASKS";
pub const ENV_THREADS: &str = "TASKBENCH_THREADS";
pub const ENV_WORKLOADS: &str = "TASKBENCH_WORKLOADS";
pub const ENV_MATRIX_SIZE: &str = "TASKBENCH_MATRIX_SIZE";
pub const ENV_REDUCTION_SIZE: &str = "TASKBENCH_REDUCTION_SIZE";
pub const ENV_SEED: &str = "TASKBENCH_SEED";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var}: cannot parse {value:?}")]
    Invalid { var: &'static str, value: String },
    #[error("{0} must not be empty")]
    Empty(&'static str),
    #[error("thread counts must be at least 1")]
    ZeroThreads,
    #[error("unknown workload: {0}")]
    UnknownWorkload(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchConfig {
    pub thread_counts: Vec<usize>,
    /// Tasks per mixed or skewed batch
    pub num_tasks: usize,
    pub matrix_size: usize,
    pub reduction_size: usize,
    pub workloads: Vec<Workload>,
    /// Seed for the skewed workload
    pub seed: u64,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            thread_counts: vec![1, 2, 4, 8, 12, 16],
            num_tasks: 1000,
            matrix_size: 50,
            reduction_size: 1000,
            workloads: vec![Workload::Mixed],
            seed: 42,
        }
    }
}

impl BenchConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Build from an arbitrary variable source, starting from defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup(ENV_TASKS) {
            config.num_tasks = parse(ENV_TASKS, &v)?;
        }
        if let Some(v) = lookup(ENV_THREADS) {
            config.thread_counts = parse_list(ENV_THREADS, &v)?;
        }
        if let Some(v) = lookup(ENV_WORKLOADS) {
            config.workloads = v
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(str::parse)
                .collect::<Result<_, _>>()?;
        }
        if let Some(v) = lookup(ENV_MATRIX_SIZE) {
            config.matrix_size = parse(ENV_MATRIX_SIZE, &v)?;
        }
        if let Some(v) = lookup(ENV_REDUCTION_SIZE) {
            config.reduction_size = parse(ENV_REDUCTION_SIZE, &v)?;
        }
        if let Some(v) = lookup(ENV_SEED) {
            config.seed = parse(ENV_SEED, &v)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.thread_counts.is_empty() {
            return Err(ConfigError::Empty(ENV_THREADS));
        }
        if self.thread_counts.contains(&0) {
            return Err(ConfigError::ZeroThreads);
        }
        if self.workloads.is_empty() {
            return Err(ConfigError::Empty(ENV_WORKLOADS));
        }
        Ok(())
    }
}

fn parse<T: FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        var,
        value: value.to_string(),
    })
}

fn parse_list<T: FromStr>(var: &'static str, value: &str) -> Result<Vec<T>, ConfigError> {
    value
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| parse(var, s))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = BenchConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, BenchConfig::default());
        assert_eq!(config.thread_counts, vec![1, 2, 4, 8, 12, 16]);
        assert_eq!(config.num_tasks, 1000);
    }

    #[test]
    fn test_overrides() {
        let config = BenchConfig::from_lookup(lookup(&[
            (ENV_TASKS, "300"),
            (ENV_THREADS, "1, 3,"),
            (ENV_WORKLOADS, "matrix,Reduction"),
            (ENV_SEED, "9"),
        ]))
        .unwrap();

        assert_eq!(config.num_tasks, 300);
        assert_eq!(config.thread_counts, vec![1, 3]);
        assert_eq!(config.workloads, vec![Workload::Matrix, Workload::Reduction]);
        assert_eq!(config.seed, 9);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            BenchConfig::from_lookup(lookup(&[(ENV_TASKS, "many")])),
            Err(ConfigError::Invalid { var: ENV_TASKS, .. })
        ));
        assert!(matches!(
            BenchConfig::from_lookup(lookup(&[(ENV_THREADS, "2,0")])),
            Err(ConfigError::ZeroThreads)
        ));
        assert!(matches!(
            BenchConfig::from_lookup(lookup(&[(ENV_THREADS, "")])),
            Err(ConfigError::Empty(ENV_THREADS))
        ));
        assert!(matches!(
            BenchConfig::from_lookup(lookup(&[(ENV_WORKLOADS, "mixed,fft")])),
            Err(ConfigError::UnknownWorkload(_))
        ));
    }
}
