//! Timers on the event loop's virtual clock.
//!
//! Promises have no built-in timeout. A deadline is expressed by racing the
//! promise against one that rejects when a timer fires, see [`timeout`].

use crate::combinators::race;
use crate::event_loop::LoopHandle;
use crate::promise::Promise;
use crate::task_queue::Task;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Handle to a scheduled timer, usable with [`LoopHandle::clear_timeout`].
///
/// Orders by due time, then by scheduling order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId {
    due: Duration,
    seq: u64,
}

impl TimerId {
    /// Virtual time at which the timer fires.
    pub fn due(&self) -> Duration {
        self.due
    }
}

/// Pending timers, earliest first.
#[derive(Debug, Default)]
pub struct TimerQueue {
    timers: BTreeMap<TimerId, Task>,
    next_seq: u64,
}

impl TimerQueue {
    /// Creates an empty timer queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `task` to run at virtual time `due`.
    pub fn schedule(&mut self, due: Duration, task: Task) -> TimerId {
        let id = TimerId {
            due,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.timers.insert(id, task);
        id
    }

    /// Removes a timer. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.timers.remove(&id).is_some()
    }

    /// Due time of the earliest timer.
    pub fn next_due(&self) -> Option<Duration> {
        self.timers.keys().next().map(TimerId::due)
    }

    /// Removes and returns the earliest timer.
    pub fn pop_next(&mut self) -> Option<(TimerId, Task)> {
        self.timers.pop_first()
    }

    /// Returns true if no timer is pending.
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Returns the number of pending timers.
    pub fn len(&self) -> usize {
        self.timers.len()
    }
}

/// A promise that fulfills after `after` has elapsed on the loop's clock.
pub fn delay<E>(handle: &LoopHandle, after: Duration) -> Promise<(), E>
where
    E: Clone + fmt::Debug + 'static,
{
    let (promise, resolver) = Promise::pending();
    handle.set_timeout(
        after,
        Task::new(move || {
            resolver.resolve(());
            Ok(())
        }),
    );
    promise
}

/// Races `promise` against a timer that rejects with `reason` after `after`.
///
/// The timer is cleared as soon as `promise` settles, so a promise that
/// settles in time leaves nothing behind on the loop.
pub fn timeout<T, E>(
    handle: &LoopHandle,
    promise: &Promise<T, E>,
    after: Duration,
    reason: E,
) -> Promise<T, E>
where
    T: Clone + 'static,
    E: Clone + fmt::Debug + 'static,
{
    let (deadline, resolver) = Promise::pending();
    let timer = handle.set_timeout(
        after,
        Task::new(move || {
            resolver.reject(reason);
            Ok(())
        }),
    );

    let handle = handle.clone();
    promise.subscribe(Box::new(move |_| {
        handle.clear_timeout(timer);
    }));

    race([promise.clone(), deadline])
}
