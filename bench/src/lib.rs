//! Scheduler Benchmark
//!
//! Workload generators, benchmark configuration, and the harness that
//! sweeps policies and thread counts into report tables.

pub mod config;
pub mod harness;
pub mod workloads;

pub use config::{BenchConfig, ConfigError};
pub use harness::{BenchReport, Harness, HarnessError};
pub use workloads::{Workload, WorkloadCheck};

use tracing_subscriber::EnvFilter;

/// Log to stderr so stdout stays pure CSV. Level from `RUST_LOG`, default `warn`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
