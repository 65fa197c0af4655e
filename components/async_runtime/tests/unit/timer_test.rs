//! Unit tests for delay and timeout

use async_runtime::{delay, race, timeout, EventLoop, Promise, PromiseState, Task};
use core_types::{ErrorKind, RuntimeError};
use std::time::Duration;

type P = Promise<&'static str, RuntimeError>;

#[test]
fn delay_fulfills_after_virtual_time() {
    let mut event_loop = EventLoop::new();
    let waited: Promise<(), RuntimeError> = delay(&event_loop.handle(), Duration::from_secs(3));

    assert!(waited.is_pending());
    event_loop.run_until_done().unwrap();
    assert_eq!(waited.state(), PromiseState::Fulfilled);
    assert_eq!(event_loop.now(), Duration::from_secs(3));
}

#[test]
fn timeout_rejects_slow_promise() {
    let mut event_loop = EventLoop::new();
    let handle = event_loop.handle();
    let (slow, _slow_resolver) = P::pending();

    let guarded = timeout(
        &handle,
        &slow,
        Duration::from_millis(50),
        RuntimeError::timeout("too slow"),
    );
    let _observed = guarded.catch(|_| Ok("recovered"));

    event_loop.run_until_done().unwrap();
    let reason = guarded.reason().unwrap();
    assert_eq!(reason.kind, ErrorKind::Timeout);
    assert!(slow.is_pending());
}

#[test]
fn timeout_passes_fast_promise_and_clears_timer() {
    let mut event_loop = EventLoop::new();
    let handle = event_loop.handle();
    let (fast, fast_resolver) = P::pending();

    let guarded = timeout(
        &handle,
        &fast,
        Duration::from_millis(50),
        RuntimeError::timeout("too slow"),
    );
    handle.enqueue_task(Task::new(move || {
        fast_resolver.resolve("in time");
        Ok(())
    }));

    event_loop.process_one_cycle().unwrap();
    assert_eq!(guarded.value(), Some("in time"));
    assert!(!event_loop.has_pending_timers());
    assert!(event_loop.unhandled_rejections().is_empty());
}

#[test]
fn race_against_delay() {
    let mut event_loop = EventLoop::new();
    let handle = event_loop.handle();

    let slow: P = delay(&handle, Duration::from_millis(200)).then(|_| Ok("slow"));
    let quick: P = delay(&handle, Duration::from_millis(20)).then(|_| Ok("quick"));
    let winner = race(vec![slow, quick]);

    event_loop.run_until_done().unwrap();
    assert_eq!(winner.value(), Some("quick"));
}
