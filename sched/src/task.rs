//! Units of work and their cost classes.

use std::fmt;

/// Coarse cost class of a task
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskWeight {
    Light = 1,
    Medium = 2,
    Heavy = 3,
}

impl TaskWeight {
    pub const ALL: [TaskWeight; 3] = [TaskWeight::Light, TaskWeight::Medium, TaskWeight::Heavy];

    /// Round-robin class for position `index`: light, medium, heavy, light, ...
    pub fn from_index(index: usize) -> Self {
        match index % 3 {
            0 => TaskWeight::Light,
            1 => TaskWeight::Medium,
            _ => TaskWeight::Heavy,
        }
    }
}

impl fmt::Display for TaskWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskWeight::Light => "light",
            TaskWeight::Medium => "medium",
            TaskWeight::Heavy => "heavy",
        };
        f.write_str(name)
    }
}

/// Submission sequence number; dense from 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub(crate) usize);

impl TaskId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Something a worker can execute exactly once.
///
/// The operation owns its context; it is dropped when `execute` returns.
pub trait Operation: Send {
    fn execute(self: Box<Self>);
}

impl<F> Operation for F
where
    F: FnOnce() + Send,
{
    fn execute(self: Box<Self>) {
        (*self)()
    }
}

/// A queued operation with its weight and id
pub struct Task {
    id: TaskId,
    weight: TaskWeight,
    op: Box<dyn Operation>,
}

impl Task {
    pub(crate) fn new(id: TaskId, weight: TaskWeight, op: Box<dyn Operation>) -> Self {
        Self { id, weight, op }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn weight(&self) -> TaskWeight {
        self.weight
    }

    /// Run the operation, consuming the task and its context
    pub(crate) fn execute(self) {
        self.op.execute()
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("weight", &self.weight)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct DropProbe(Arc<AtomicUsize>);

    impl Drop for DropProbe {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_round_robin_weights() {
        let weights: Vec<TaskWeight> = (0..6).map(TaskWeight::from_index).collect();
        assert_eq!(
            weights,
            vec![
                TaskWeight::Light,
                TaskWeight::Medium,
                TaskWeight::Heavy,
                TaskWeight::Light,
                TaskWeight::Medium,
                TaskWeight::Heavy,
            ]
        );
        assert_eq!(TaskWeight::Heavy as u8, 3);
    }

    #[test]
    fn test_context_released_once_after_execute() {
        let drops = Arc::new(AtomicUsize::new(0));
        let ran = Arc::new(AtomicUsize::new(0));

        let probe = DropProbe(Arc::clone(&drops));
        let ran_in_task = Arc::clone(&ran);
        let drops_in_task = Arc::clone(&drops);
        let task = Task::new(
            TaskId(0),
            TaskWeight::Light,
            Box::new(move || {
                let _probe = &probe;
                // Context still alive while the body runs
                assert_eq!(drops_in_task.load(Ordering::SeqCst), 0);
                ran_in_task.fetch_add(1, Ordering::SeqCst);
            }),
        );

        task.execute();
        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }
}
