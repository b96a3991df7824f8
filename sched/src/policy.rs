//! Work-distribution policies.
//!
//! Each policy moves the batch's tasks to the workers of one parallel
//! region: Static hands each worker an owned chunk up front, Dynamic and
//! Guided share a locked cursor over the remaining tasks, and
//! Heterogeneous combines the two after stratifying by weight.

use std::ops::Range;
use std::sync::{Mutex, PoisonError};
use std::vec;

use tracing::debug;

use crate::error::SchedError;
use crate::region::parallel_region;
use crate::scheduler::RunContext;
use crate::task::{Task, TaskWeight};

/// Contiguous ranges of `ceil(len / workers)` indices; trailing ranges may
/// be short or empty.
pub fn static_partition(len: usize, workers: usize) -> Vec<Range<usize>> {
    let workers = workers.max(1);
    let chunk = len.div_ceil(workers);
    (0..workers)
        .map(|w| {
            let start = (w * chunk).min(len);
            let end = ((w + 1) * chunk).min(len);
            start..end
        })
        .collect()
}

/// Size of the next guided claim: `max(1, ceil(remaining / workers))`
pub fn guided_chunk(remaining: usize, workers: usize) -> usize {
    remaining.div_ceil(workers.max(1)).max(1)
}

/// Chunk sizes granted, in claim order, when `len` tasks are drained
/// under the guided policy. Claims are serialized by the cursor lock, so
/// this sequence holds regardless of which worker makes each claim.
pub fn guided_schedule(len: usize, workers: usize) -> Vec<usize> {
    let mut sizes = Vec::new();
    let mut remaining = len;
    while remaining > 0 {
        let chunk = guided_chunk(remaining, workers).min(remaining);
        sizes.push(chunk);
        remaining -= chunk;
    }
    sizes
}

/// Move tasks into per-worker chunks following [`static_partition`]
fn split_chunks(tasks: Vec<Task>, workers: usize) -> Vec<Vec<Task>> {
    let ranges = static_partition(tasks.len(), workers);
    let mut iter = tasks.into_iter();
    ranges
        .iter()
        .map(|r| iter.by_ref().take(r.len()).collect())
        .collect()
}

/// Shared claim cursor over the tasks not yet handed out
struct ClaimCursor<'a> {
    pending: Mutex<vec::IntoIter<Task>>,
    ctx: &'a RunContext<'a>,
}

impl<'a> ClaimCursor<'a> {
    fn new(tasks: Vec<Task>, ctx: &'a RunContext<'a>) -> Self {
        Self {
            pending: Mutex::new(tasks.into_iter()),
            ctx,
        }
    }

    fn claim_one(&self) -> Option<Task> {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        let task = pending.next()?;
        self.ctx.metrics.record_queue_access();
        Some(task)
    }

    fn claim_guided(&self, workers: usize) -> Vec<Task> {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        let remaining = pending.len();
        if remaining == 0 {
            return Vec::new();
        }
        let chunk = guided_chunk(remaining, workers);
        let claimed: Vec<Task> = pending.by_ref().take(chunk).collect();
        self.ctx.metrics.record_queue_access();
        claimed
    }
}

pub(crate) fn run_static(
    ctx: &RunContext<'_>,
    tasks: Vec<Task>,
    workers: usize,
) -> Result<(), SchedError> {
    parallel_region(split_chunks(tasks, workers), |worker, chunk| {
        let mut clock = ctx.start_worker(worker);
        for task in chunk {
            clock.run(task);
        }
    })
}

pub(crate) fn run_dynamic(
    ctx: &RunContext<'_>,
    tasks: Vec<Task>,
    workers: usize,
) -> Result<(), SchedError> {
    let cursor = ClaimCursor::new(tasks, ctx);
    parallel_region(vec![(); workers], |worker, ()| {
        let mut clock = ctx.start_worker(worker);
        while let Some(task) = cursor.claim_one() {
            clock.run(task);
        }
    })
}

pub(crate) fn run_guided(
    ctx: &RunContext<'_>,
    tasks: Vec<Task>,
    workers: usize,
) -> Result<(), SchedError> {
    let cursor = ClaimCursor::new(tasks, ctx);
    parallel_region(vec![(); workers], |worker, ()| {
        let mut clock = ctx.start_worker(worker);
        loop {
            let chunk = cursor.claim_guided(workers);
            if chunk.is_empty() {
                break;
            }
            for task in chunk {
                clock.run(task);
            }
        }
    })
}

pub(crate) fn run_heterogeneous(
    ctx: &RunContext<'_>,
    tasks: Vec<Task>,
    workers: usize,
) -> Result<(), SchedError> {
    let strata = stratify(tasks)?;
    debug!(
        "Stratified batch: {} light, {} medium+heavy",
        strata.light.len(),
        strata.rest.len()
    );

    let cursor = ClaimCursor::new(strata.rest, ctx);
    parallel_region(split_chunks(strata.light, workers), |worker, light| {
        let mut clock = ctx.start_worker(worker);
        for task in light {
            clock.run(task);
        }
        while let Some(task) = cursor.claim_one() {
            clock.run(task);
        }
    })
}

/// A batch regrouped by weight: `light`, then `rest` = medium followed by heavy
#[derive(Debug)]
pub(crate) struct Strata {
    pub(crate) light: Vec<Task>,
    pub(crate) rest: Vec<Task>,
}

/// Stable partition by weight class; relative order within a class is kept.
pub(crate) fn stratify(tasks: Vec<Task>) -> Result<Strata, SchedError> {
    let mut counts = [0usize; 3];
    for task in &tasks {
        counts[task.weight() as usize - 1] += 1;
    }

    let mut light = reserve(counts[0])?;
    let mut medium = reserve(counts[1] + counts[2])?;
    let mut heavy = reserve(counts[2])?;

    for task in tasks {
        match task.weight() {
            TaskWeight::Light => light.push(task),
            TaskWeight::Medium => medium.push(task),
            TaskWeight::Heavy => heavy.push(task),
        }
    }
    // Capacity for the heavy tail was reserved above
    medium.append(&mut heavy);

    Ok(Strata { light, rest: medium })
}

fn reserve(n: usize) -> Result<Vec<Task>, SchedError> {
    let mut v = Vec::new();
    v.try_reserve_exact(n)
        .map_err(|source| SchedError::Allocation { requested: n, source })?;
    Ok(v)
}
