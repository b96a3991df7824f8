//! Scheduler benchmark
//!
//! Sweeps every schedule mode and the lock-based reference over the
//! configured thread counts and prints three CSV tables to stdout.

use std::io;

use bench::{BenchConfig, Harness};

fn main() {
    bench::init_tracing();

    if let Err(e) = run() {
        eprintln!("benchmark failed: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let config = BenchConfig::from_env()?;
    tracing::info!("Benchmark config: {:?}", config);

    let report = Harness::new(config).run()?;
    report.write(io::stdout().lock())?;
    Ok(())
}
