//! Task Scheduler
//!
//! Runs a pre-populated, fixed-size batch of tasks on a pool of worker
//! threads under one of four distribution policies, recording per-task
//! latency and per-worker completion counts along the way.

pub mod error;
pub mod mode;
pub mod policy;
pub mod queue;
pub mod reference;
pub mod region;
pub mod scheduler;
pub mod task;

pub use error::SchedError;
pub use mode::ScheduleMode;
pub use queue::{QueueSnapshot, TaskQueue};
pub use reference::{run_lock_based, ReferenceReport};
pub use region::parallel_region;
pub use scheduler::{CompletionHandle, RunReport, Scheduler, SchedulerConfig};
pub use task::{Operation, Task, TaskId, TaskWeight};
