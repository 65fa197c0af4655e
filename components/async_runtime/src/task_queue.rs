//! Jobs and the FIFO queues that hold them.
//!
//! A [`Task`] is one unit of host work (a script turn, a timer callback). A
//! [`MicroTask`] is a promise job. Both are one-shot closures that report a
//! failure by returning `Err`, which the loop logs without stopping.

use core_types::RuntimeResult;
use std::collections::VecDeque;
use std::fmt;

type Callback = Box<dyn FnOnce() -> RuntimeResult<()>>;

/// A task to be executed by the event loop.
pub struct Task(Callback);

/// A promise job, run at the next microtask checkpoint.
pub struct MicroTask(Callback);

impl Task {
    /// Wraps a closure as a task.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() -> RuntimeResult<()> + 'static,
    {
        Self(Box::new(f))
    }

    /// Executes the task.
    pub fn run(self) -> RuntimeResult<()> {
        (self.0)()
    }
}

impl MicroTask {
    /// Wraps a fallible closure as a microtask.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() -> RuntimeResult<()> + 'static,
    {
        Self(Box::new(f))
    }

    /// Wraps a closure that cannot fail. Promise reactions use this; their
    /// errors become rejections rather than job failures.
    pub fn infallible<F>(f: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Self::new(move || {
            f();
            Ok(())
        })
    }

    /// Executes the microtask.
    pub fn run(self) -> RuntimeResult<()> {
        (self.0)()
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Task(..)")
    }
}

impl fmt::Debug for MicroTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MicroTask(..)")
    }
}

/// A first-in first-out queue of jobs.
pub struct JobQueue<J> {
    jobs: VecDeque<J>,
}

/// Host tasks waiting for a turn.
pub type TaskQueue = JobQueue<Task>;

/// Promise jobs waiting for a checkpoint.
pub type MicrotaskQueue = JobQueue<MicroTask>;

impl<J> JobQueue<J> {
    /// Creates an empty queue.
    pub const fn new() -> Self {
        Self {
            jobs: VecDeque::new(),
        }
    }

    /// Appends a job at the tail.
    pub fn enqueue(&mut self, job: J) {
        self.jobs.push_back(job);
    }

    /// Takes the job at the head.
    pub fn dequeue(&mut self) -> Option<J> {
        self.jobs.pop_front()
    }

    /// Returns true if no job is waiting.
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Number of waiting jobs.
    pub fn len(&self) -> usize {
        self.jobs.len()
    }
}

impl<J> Default for JobQueue<J> {
    fn default() -> Self {
        Self::new()
    }
}

impl<J> fmt::Debug for JobQueue<J> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobQueue").field("len", &self.len()).finish()
    }
}
