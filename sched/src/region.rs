//! Parallel region primitive.
//!
//! Spawns one scoped worker per input, hands each worker its input, and
//! joins them all before returning. Every policy is layered on this.

use std::panic;
use std::thread;

use crate::error::SchedError;

/// Run `body(worker_index, input)` on its own thread for every input.
///
/// Blocks until all workers have returned. If a worker panics, the
/// remaining workers are still joined and the first panic is then resumed
/// on the calling thread.
pub fn parallel_region<I, F>(inputs: Vec<I>, body: F) -> Result<(), SchedError>
where
    I: Send,
    F: Fn(usize, I) + Sync,
{
    let body = &body;

    thread::scope(|scope| {
        let mut handles = Vec::with_capacity(inputs.len());
        for (worker, input) in inputs.into_iter().enumerate() {
            let handle = thread::Builder::new()
                .name(format!("sched-worker-{}", worker))
                .spawn_scoped(scope, move || body(worker, input))
                .map_err(|source| SchedError::Spawn { worker, source })?;
            handles.push(handle);
        }

        let mut first_panic = None;
        for handle in handles {
            if let Err(payload) = handle.join() {
                first_panic.get_or_insert(payload);
            }
        }
        if let Some(payload) = first_panic {
            panic::resume_unwind(payload);
        }

        Ok(())
    })
}
