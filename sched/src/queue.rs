//! Fixed-capacity, append-only task batch.
//!
//! The queue is filled once, handed to a [`Scheduler`](crate::Scheduler),
//! and consumed by a single run. There is no dequeue operation.

use crate::error::SchedError;
use crate::task::{Operation, Task, TaskId, TaskWeight};

#[derive(Debug)]
pub struct TaskQueue {
    tasks: Vec<Task>,
    capacity: usize,
}

impl TaskQueue {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            tasks: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a task. Ids are assigned in submission order.
    pub fn submit<O>(&mut self, op: O, weight: TaskWeight) -> Result<TaskId, SchedError>
    where
        O: Operation + 'static,
    {
        if self.tasks.len() >= self.capacity {
            return Err(SchedError::Capacity {
                capacity: self.capacity,
            });
        }

        let id = TaskId(self.tasks.len());
        self.tasks.push(Task::new(id, weight, Box::new(op)));
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn snapshot(&self) -> QueueSnapshot<'_> {
        QueueSnapshot { tasks: &self.tasks }
    }

    pub(crate) fn take_tasks(&mut self) -> Vec<Task> {
        std::mem::take(&mut self.tasks)
    }
}

/// Read-only view of the queued tasks
#[derive(Debug, Clone, Copy)]
pub struct QueueSnapshot<'a> {
    tasks: &'a [Task],
}

impl<'a> QueueSnapshot<'a> {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TaskId, TaskWeight)> + 'a {
        self.tasks.iter().map(|t| (t.id(), t.weight()))
    }

    /// Task counts per weight class, in light/medium/heavy order
    pub fn weight_counts(&self) -> [usize; 3] {
        let mut counts = [0; 3];
        for task in self.tasks {
            counts[task.weight() as usize - 1] += 1;
        }
        counts
    }
}
