//! Correctness checks
//!
//! Submits counter-increment tasks under every schedule mode and checks
//! that each task ran exactly once.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Context;
use sched::{ScheduleMode, Scheduler, SchedulerConfig, TaskQueue, TaskWeight};
use telemetry::MetricsSnapshot;

const WORKERS: usize = 4;
const CAPACITY: usize = 1000;

/// Run `tasks` counter increments and return the final count
fn count_run(mode: ScheduleMode, tasks: usize) -> anyhow::Result<(u64, MetricsSnapshot)> {
    let counter = Arc::new(AtomicU64::new(0));
    let mut queue = TaskQueue::with_capacity(CAPACITY);
    for _ in 0..tasks {
        let counter = Arc::clone(&counter);
        queue.submit(
            move || {
                counter.fetch_add(1, Ordering::Relaxed);
            },
            TaskWeight::Light,
        )?;
    }

    let mut sched = Scheduler::new(queue, SchedulerConfig::new(WORKERS, mode))?;
    sched
        .run()
        .with_context(|| format!("{} run failed", mode))?;
    sched.wait()?;

    Ok((counter.load(Ordering::Relaxed), sched.metrics()))
}

fn check(name: &str, mode: ScheduleMode, tasks: usize) -> anyhow::Result<bool> {
    print!("{}...", name);
    let (count, metrics) = count_run(mode, tasks)?;
    let pass = count == tasks as u64 && metrics.tasks_completed == count;
    println!(
        " counter={} (expected {}) {}",
        count,
        tasks,
        if pass { "PASS" } else { "FAIL" }
    );
    println!("{}\n", metrics);
    Ok(pass)
}

fn main() {
    bench::init_tracing();
    println!("=== CORRECTNESS TESTS ===\n");

    let mut checks = vec![(
        "Test 1: Basic task submission".to_string(),
        ScheduleMode::Dynamic,
        100,
    )];
    for (i, mode) in ScheduleMode::ALL.into_iter().enumerate() {
        checks.push((format!("Test {}: {} scheduling", i + 2, mode), mode, 50));
    }

    let mut failures = 0;
    for (name, mode, tasks) in checks {
        match check(&name, mode, tasks) {
            Ok(true) => {}
            Ok(false) => failures += 1,
            Err(e) => {
                println!(" ERROR: {:#}", e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        eprintln!("{} correctness check(s) failed", failures);
        std::process::exit(1);
    }
    println!("\nALL TESTS PASSED");
}
