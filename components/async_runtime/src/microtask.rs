//! The process-wide microtask queue.
//!
//! The runtime is single-threaded and cooperative, so "process-wide" means one
//! queue per thread. Promises enqueue their reaction jobs here without needing
//! a handle to the event loop; whoever drives the loop calls
//! [`perform_checkpoint`] once the current synchronous turn has returned.
//!
//! Jobs run strictly FIFO and each runs to completion before the next starts.
//! A job enqueued while the queue drains joins the tail and runs in the same
//! checkpoint.

use crate::error::EventLoopError;
use crate::task_queue::{MicroTask, MicrotaskQueue};
use core_types::RuntimeError;
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};

thread_local! {
    static QUEUE: RefCell<MicrotaskQueue> = RefCell::new(MicrotaskQueue::new());
    static DRAINING: Cell<bool> = const { Cell::new(false) };
}

/// Outcome of one microtask checkpoint.
#[derive(Debug, Default)]
pub struct CheckpointReport {
    /// Number of jobs that ran
    pub executed: usize,
    /// Errors returned by jobs, in the order they occurred
    pub failures: Vec<RuntimeError>,
}

/// Appends a job to the tail of this thread's microtask queue.
///
/// Never runs the job synchronously, even when the queue is idle.
pub fn enqueue_microtask(microtask: MicroTask) {
    QUEUE.with(|queue| queue.borrow_mut().enqueue(microtask));
}

/// Appends an infallible closure as a job.
///
/// # Examples
///
/// ```
/// use async_runtime::microtask::{perform_checkpoint, queue_microtask};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let ran = Rc::new(Cell::new(false));
/// let flag = ran.clone();
/// queue_microtask(move || flag.set(true));
/// assert!(!ran.get());
///
/// perform_checkpoint(None).unwrap();
/// assert!(ran.get());
/// ```
pub fn queue_microtask<F>(f: F)
where
    F: FnOnce() + 'static,
{
    enqueue_microtask(MicroTask::infallible(f));
}

/// Number of jobs waiting in this thread's queue.
pub fn pending_microtasks() -> usize {
    QUEUE.with(|queue| queue.borrow().len())
}

/// True while a checkpoint is running on this thread.
pub fn is_draining() -> bool {
    DRAINING.with(Cell::get)
}

struct DrainGuard;

impl DrainGuard {
    fn enter() -> Self {
        DRAINING.with(|d| d.set(true));
        DrainGuard
    }
}

impl Drop for DrainGuard {
    fn drop(&mut self) {
        DRAINING.with(|d| d.set(false));
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

// A panic counts as a job failure. Jobs hold no borrow of the queue or of a
// promise while user code runs, so unwinding leaves both consistent.
fn run_job(microtask: MicroTask) -> Result<(), RuntimeError> {
    match panic::catch_unwind(AssertUnwindSafe(|| microtask.run())) {
        Ok(result) => result,
        Err(payload) => Err(RuntimeError::internal(format!(
            "microtask panicked: {}",
            panic_message(payload.as_ref())
        ))),
    }
}

/// Drains the microtask queue.
///
/// Called from inside a running job this is a no-op: the outer checkpoint
/// already owns the queue and will reach any newly queued job.
///
/// A job that returns `Err` or panics is logged and recorded in the report;
/// draining continues with the next job. A promise whose handler panicked
/// stays pending.
///
/// # Errors
///
/// Returns [`EventLoopError::MicrotaskLimitExceeded`] when `limit` jobs have
/// run and more are still queued. Remaining jobs stay queued, and the error
/// carries the failures of the jobs that did run.
pub fn perform_checkpoint(limit: Option<usize>) -> Result<CheckpointReport, EventLoopError> {
    if is_draining() {
        return Ok(CheckpointReport::default());
    }

    let _guard = DrainGuard::enter();
    let mut report = CheckpointReport::default();

    loop {
        if let Some(limit) = limit {
            if report.executed >= limit && pending_microtasks() > 0 {
                tracing::warn!(limit, pending = pending_microtasks(), "microtask limit reached");
                return Err(EventLoopError::MicrotaskLimitExceeded {
                    limit,
                    failures: report.failures,
                });
            }
        }

        let Some(microtask) = QUEUE.with(|queue| queue.borrow_mut().dequeue()) else {
            break;
        };

        report.executed += 1;
        if let Err(error) = run_job(microtask) {
            tracing::error!(%error, "microtask failed");
            report.failures.push(error);
        }
    }

    if report.executed > 0 {
        tracing::debug!(
            executed = report.executed,
            failures = report.failures.len(),
            "microtask checkpoint complete"
        );
    }
    Ok(report)
}
