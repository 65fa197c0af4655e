//! Unhandled rejection tracking.
//!
//! A promise that rejects before anything has been registered on it is
//! recorded here. If a registration arrives before the host next collects
//! the records, the record is dropped; otherwise the host receives it as an
//! [`UnhandledRejection`]. Detection never aborts anything.
//!
//! Records of unhandled promises stay until collected, so a host that drives
//! [`perform_checkpoint`](crate::microtask::perform_checkpoint) itself must
//! poll [`take_unhandled_rejections`] after each checkpoint, as
//! [`EventLoop`](crate::EventLoop) does. Records of promises that have since
//! gained a handler are pruned whenever a new rejection is tracked.
//!
//! A promise that follows itself is reported here too, with a `TypeError`
//! reason, since it can never settle.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// A promise's handled flag, shared between the promise and its record so
/// the tracker needs neither the value and error types nor a live promise.
pub(crate) type HandledFlag = Rc<Cell<bool>>;

struct TrackedRejection {
    promise_id: u64,
    reason: String,
    // `None` for promises that can never settle; always reported.
    handled: Option<HandledFlag>,
}

impl TrackedRejection {
    fn is_unhandled(&self) -> bool {
        self.handled.as_ref().map_or(true, |handled| !handled.get())
    }
}

thread_local! {
    static TRACKED: RefCell<Vec<TrackedRejection>> = const { RefCell::new(Vec::new()) };
}

/// A promise that was rejected and never observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnhandledRejection {
    /// Id of the rejected promise
    pub promise_id: u64,
    /// `Debug` rendering of the rejection reason
    pub reason: String,
}

impl fmt::Display for UnhandledRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "promise #{} rejected: {}", self.promise_id, self.reason)
    }
}

pub(crate) fn track(promise_id: u64, reason: String, handled: HandledFlag) {
    tracing::trace!(promise_id, %reason, "rejection without observers");
    push(TrackedRejection {
        promise_id,
        reason,
        handled: Some(handled),
    });
}

pub(crate) fn track_unsettleable(promise_id: u64, reason: String) {
    push(TrackedRejection {
        promise_id,
        reason,
        handled: None,
    });
}

fn push(entry: TrackedRejection) {
    TRACKED.with(|tracked| {
        let mut tracked = tracked.borrow_mut();
        tracked.retain(TrackedRejection::is_unhandled);
        tracked.push(entry);
    });
}

/// Number of records waiting for collection. May include promises handled
/// since the last new rejection.
pub fn tracked_rejections() -> usize {
    TRACKED.with(|tracked| tracked.borrow().len())
}

/// Collects rejections that are still unhandled and clears the tracker.
///
/// A promise dropped without ever being observed counts as unhandled.
pub fn take_unhandled_rejections() -> Vec<UnhandledRejection> {
    let tracked = TRACKED.with(|tracked| std::mem::take(&mut *tracked.borrow_mut()));
    tracked
        .into_iter()
        .filter(TrackedRejection::is_unhandled)
        .map(|entry| UnhandledRejection {
            promise_id: entry.promise_id,
            reason: entry.reason,
        })
        .collect()
}
