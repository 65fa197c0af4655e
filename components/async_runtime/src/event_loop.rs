//! Event loop implementation.
//!
//! This module provides the host scheduler that drives tasks, timers and the
//! microtask queue following the JavaScript event loop model.

use crate::config::EventLoopConfig;
use crate::error::EventLoopError;
use crate::microtask::{self, CheckpointReport};
use crate::promise::{Promise, Settlement};
use crate::rejection::{self, UnhandledRejection};
use crate::task_queue::{MicroTask, Task, TaskQueue};
use crate::timer::{TimerId, TimerQueue};
use core_types::RuntimeError;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

#[derive(Debug, Default)]
struct LoopState {
    tasks: TaskQueue,
    timers: TimerQueue,
    now: Duration,
}

/// A cloneable handle for scheduling work onto an [`EventLoop`].
///
/// Closures running inside the loop capture a handle to queue follow-up
/// tasks or timers.
#[derive(Debug, Clone, Default)]
pub struct LoopHandle {
    state: Rc<RefCell<LoopState>>,
}

impl LoopHandle {
    /// Adds a task to the end of the task queue.
    pub fn enqueue_task(&self, task: Task) {
        self.state.borrow_mut().tasks.enqueue(task);
    }

    /// Runs `task` once `delay` has elapsed on the loop's virtual clock.
    pub fn set_timeout(&self, delay: Duration, task: Task) -> TimerId {
        let mut state = self.state.borrow_mut();
        let due = state.now + delay;
        let id = state.timers.schedule(due, task);
        tracing::trace!(?due, "timer scheduled");
        id
    }

    /// Cancels a timer. Returns false if it already fired or was cancelled.
    pub fn clear_timeout(&self, id: TimerId) -> bool {
        self.state.borrow_mut().timers.cancel(id)
    }

    /// The loop's virtual clock.
    pub fn now(&self) -> Duration {
        self.state.borrow().now
    }
}

/// The event loop.
///
/// Each iteration (turn) of the loop:
/// 1. Drains microtasks left over by the host's synchronous code
/// 2. Takes the oldest task, or the earliest timer if no task is queued, and executes it
/// 3. Drains all microtasks in the microtask queue
/// 4. Collects promises that were rejected without a handler
///
/// Time is virtual: when only timers remain, the clock jumps to the next one.
///
/// # Examples
///
/// ```
/// use async_runtime::{EventLoop, Task};
///
/// let mut event_loop = EventLoop::new();
///
/// event_loop.enqueue_task(Task::new(|| Ok(())));
/// event_loop.run_until_done().unwrap();
/// ```
pub struct EventLoop {
    handle: LoopHandle,
    config: EventLoopConfig,
    uncaught_errors: Vec<RuntimeError>,
    unhandled_rejections: Vec<UnhandledRejection>,
}

impl fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLoop")
            .field("config", &self.config)
            .field("now", &self.now())
            .field("uncaught_errors", &self.uncaught_errors.len())
            .field("unhandled_rejections", &self.unhandled_rejections.len())
            .finish()
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLoop {
    /// Creates a new EventLoop with empty queues and the default config.
    pub fn new() -> Self {
        Self::with_config(EventLoopConfig::default())
    }

    /// Creates a new EventLoop with the given config.
    pub fn with_config(config: EventLoopConfig) -> Self {
        Self {
            handle: LoopHandle::default(),
            config,
            uncaught_errors: Vec::new(),
            unhandled_rejections: Vec::new(),
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &EventLoopConfig {
        &self.config
    }

    /// A handle for scheduling tasks and timers from inside the loop.
    pub fn handle(&self) -> LoopHandle {
        self.handle.clone()
    }

    /// Adds a task to the task queue.
    pub fn enqueue_task(&mut self, task: Task) {
        self.handle.enqueue_task(task);
    }

    /// Adds a microtask to this thread's microtask queue.
    pub fn enqueue_microtask(&mut self, microtask: MicroTask) {
        microtask::enqueue_microtask(microtask);
    }

    /// Returns true if the task queue is empty.
    pub fn is_task_queue_empty(&self) -> bool {
        self.handle.state.borrow().tasks.is_empty()
    }

    /// Returns true if the microtask queue is empty.
    pub fn is_microtask_queue_empty(&self) -> bool {
        microtask::pending_microtasks() == 0
    }

    /// Returns true if any timer is waiting to fire.
    pub fn has_pending_timers(&self) -> bool {
        !self.handle.state.borrow().timers.is_empty()
    }

    /// Returns true when there is nothing left to run.
    pub fn is_idle(&self) -> bool {
        self.is_task_queue_empty() && self.is_microtask_queue_empty() && !self.has_pending_timers()
    }

    /// The virtual clock.
    pub fn now(&self) -> Duration {
        self.handle.now()
    }

    /// Errors returned by tasks and microtasks so far.
    pub fn uncaught_errors(&self) -> &[RuntimeError] {
        &self.uncaught_errors
    }

    /// Rejections detected without a handler so far.
    pub fn unhandled_rejections(&self) -> &[UnhandledRejection] {
        &self.unhandled_rejections
    }

    /// Takes the detected unhandled rejections, leaving the list empty.
    pub fn take_unhandled_rejections(&mut self) -> Vec<UnhandledRejection> {
        std::mem::take(&mut self.unhandled_rejections)
    }

    /// Runs all microtasks in the queue until empty.
    ///
    /// New microtasks added during execution are also processed before this
    /// method returns. Unhandled rejections are collected afterwards.
    ///
    /// # Errors
    ///
    /// Fails when the configured microtask limit trips. Failures of the jobs
    /// that ran before it are still recorded in [`Self::uncaught_errors`].
    pub fn run_all_microtasks(&mut self) -> Result<(), EventLoopError> {
        let result = microtask::perform_checkpoint(self.config.microtask_limit);
        match &result {
            Ok(CheckpointReport { failures, .. })
            | Err(EventLoopError::MicrotaskLimitExceeded { failures, .. }) => {
                self.uncaught_errors.extend(failures.iter().cloned());
            }
            Err(_) => {}
        }
        self.collect_unhandled_rejections();
        result.map(|_| ())
    }

    /// Runs all queued tasks without draining microtasks between them.
    ///
    /// This is primarily for testing purposes.
    pub fn run_all_tasks(&mut self) {
        loop {
            let task = self.handle.state.borrow_mut().tasks.dequeue();
            match task {
                Some(task) => self.run_task(task),
                None => break,
            }
        }
    }

    /// Processes one complete cycle: one task (or timer) followed by all microtasks.
    pub fn process_one_cycle(&mut self) -> Result<(), EventLoopError> {
        self.run_all_microtasks()?;

        if let Some(task) = self.next_task() {
            self.run_task(task);
        }

        self.run_all_microtasks()
    }

    /// Runs the event loop until all tasks, timers and microtasks are processed.
    pub fn run_until_done(&mut self) -> Result<(), EventLoopError> {
        while !self.is_idle() {
            self.process_one_cycle()?;
        }
        Ok(())
    }

    /// Runs the loop until `promise` settles or nothing is left to run.
    ///
    /// The caller observes the outcome, so the promise counts as handled.
    /// Returns the outcome, or `None` if the promise can no longer settle.
    pub fn run_until_settled<T, E>(
        &mut self,
        promise: &Promise<T, E>,
    ) -> Result<Option<Settlement<T, E>>, EventLoopError>
    where
        T: Clone + 'static,
        E: Clone + fmt::Debug + 'static,
    {
        promise.subscribe(Box::new(|_| {}));
        while promise.is_pending() && !self.is_idle() {
            self.process_one_cycle()?;
        }
        Ok(promise.settlement())
    }

    fn next_task(&mut self) -> Option<Task> {
        let mut state = self.handle.state.borrow_mut();
        if let Some(task) = state.tasks.dequeue() {
            return Some(task);
        }

        let (id, task) = state.timers.pop_next()?;
        if id.due() > state.now {
            state.now = id.due();
        }
        tracing::trace!(now = ?state.now, "timer fired");
        Some(task)
    }

    fn run_task(&mut self, task: Task) {
        if let Err(error) = task.run() {
            tracing::error!(%error, "task failed");
            self.uncaught_errors.push(error);
        }
    }

    fn collect_unhandled_rejections(&mut self) {
        for rejection in rejection::take_unhandled_rejections() {
            if self.config.report_unhandled_rejections {
                tracing::warn!(
                    promise_id = rejection.promise_id,
                    reason = %rejection.reason,
                    "unhandled promise rejection"
                );
            }
            self.unhandled_rejections.push(rejection);
        }
    }
}
