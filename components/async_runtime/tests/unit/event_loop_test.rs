//! Unit tests for EventLoop

use async_runtime::{
    EventLoop, EventLoopConfig, EventLoopError, MicroTask, Promise, PromiseState, Settlement, Task,
};
use core_types::RuntimeError;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

fn recorder() -> Rc<RefCell<Vec<i32>>> {
    Rc::new(RefCell::new(vec![]))
}

#[test]
fn new_event_loop_has_empty_queues() {
    let event_loop = EventLoop::new();
    assert!(event_loop.is_task_queue_empty());
    assert!(event_loop.is_microtask_queue_empty());
    assert!(!event_loop.has_pending_timers());
}

#[test]
fn enqueue_task_adds_to_task_queue() {
    let mut event_loop = EventLoop::new();
    event_loop.enqueue_task(Task::new(|| Ok(())));
    assert!(!event_loop.is_task_queue_empty());
}

#[test]
fn enqueue_microtask_adds_to_microtask_queue() {
    let mut event_loop = EventLoop::new();
    event_loop.enqueue_microtask(MicroTask::new(|| Ok(())));
    assert!(!event_loop.is_microtask_queue_empty());
    event_loop.run_all_microtasks().unwrap();
    assert!(event_loop.is_microtask_queue_empty());
}

#[test]
fn task_queue_fifo_order() {
    let mut event_loop = EventLoop::new();
    let results = recorder();

    for i in 1..=2 {
        let r = results.clone();
        event_loop.enqueue_task(Task::new(move || {
            r.borrow_mut().push(i);
            Ok(())
        }));
    }

    event_loop.run_all_tasks();
    assert_eq!(*results.borrow(), vec![1, 2]);
}

#[test]
fn microtasks_drain_after_each_task() {
    let mut event_loop = EventLoop::new();
    let handle = event_loop.handle();
    let results = recorder();

    let r = results.clone();
    event_loop.enqueue_task(Task::new(move || {
        r.borrow_mut().push(1);
        let r2 = r.clone();
        async_runtime::microtask::queue_microtask(move || r2.borrow_mut().push(2));
        Ok(())
    }));
    let r = results.clone();
    handle.enqueue_task(Task::new(move || {
        r.borrow_mut().push(3);
        Ok(())
    }));

    event_loop.process_one_cycle().unwrap();
    assert_eq!(*results.borrow(), vec![1, 2]);

    event_loop.run_until_done().unwrap();
    assert_eq!(*results.borrow(), vec![1, 2, 3]);
}

#[test]
fn jobs_queued_by_handlers_do_not_jump_ahead() {
    let mut event_loop = EventLoop::new();
    let results = recorder();

    let (a, a_resolver) = Promise::<i32, RuntimeError>::pending();
    let (b, b_resolver) = Promise::<i32, RuntimeError>::pending();

    let r = results.clone();
    let _a_next = a
        .then(move |v| {
            r.borrow_mut().push(v);
            Ok(v * 10)
        })
        .then({
            let r = results.clone();
            move |v| {
                r.borrow_mut().push(v);
                Ok(v)
            }
        });
    let r = results.clone();
    let _b_next = b.then(move |v| {
        r.borrow_mut().push(v);
        Ok(v)
    });

    a_resolver.resolve(1);
    b_resolver.resolve(2);
    event_loop.run_until_done().unwrap();

    // a's second link was queued by a's first handler, after b's handler
    assert_eq!(*results.borrow(), vec![1, 2, 10]);
}

#[test]
fn empty_event_loop_run_completes_immediately() {
    let mut event_loop = EventLoop::new();
    assert!(event_loop.run_until_done().is_ok());
}

#[test]
fn timers_fire_in_due_order_after_tasks() {
    let mut event_loop = EventLoop::new();
    let handle = event_loop.handle();
    let results = recorder();

    let r = results.clone();
    handle.set_timeout(
        Duration::from_millis(20),
        Task::new(move || {
            r.borrow_mut().push(20);
            Ok(())
        }),
    );
    let r = results.clone();
    handle.set_timeout(
        Duration::from_millis(10),
        Task::new(move || {
            r.borrow_mut().push(10);
            Ok(())
        }),
    );
    let r = results.clone();
    handle.enqueue_task(Task::new(move || {
        r.borrow_mut().push(0);
        Ok(())
    }));

    event_loop.run_until_done().unwrap();
    assert_eq!(*results.borrow(), vec![0, 10, 20]);
    assert_eq!(event_loop.now(), Duration::from_millis(20));
}

#[test]
fn cleared_timer_never_fires() {
    let mut event_loop = EventLoop::new();
    let handle = event_loop.handle();
    let results = recorder();

    let r = results.clone();
    let id = handle.set_timeout(
        Duration::from_millis(5),
        Task::new(move || {
            r.borrow_mut().push(5);
            Ok(())
        }),
    );
    assert!(handle.clear_timeout(id));

    event_loop.run_until_done().unwrap();
    assert!(results.borrow().is_empty());
}

#[test]
fn failing_microtask_does_not_stop_the_loop() {
    let mut event_loop = EventLoop::new();
    let results = recorder();

    event_loop.enqueue_microtask(MicroTask::new(|| Err(RuntimeError::internal("broken job"))));
    let r = results.clone();
    event_loop.enqueue_microtask(MicroTask::infallible(move || r.borrow_mut().push(1)));

    event_loop.run_until_done().unwrap();
    assert_eq!(*results.borrow(), vec![1]);
    assert_eq!(event_loop.uncaught_errors(), &[RuntimeError::internal("broken job")]);
}

#[test]
fn microtask_limit_stops_runaway_jobs() {
    fn requeue() {
        async_runtime::microtask::queue_microtask(requeue);
    }

    let config = EventLoopConfig {
        microtask_limit: Some(50),
        ..EventLoopConfig::default()
    };
    let mut event_loop = EventLoop::with_config(config);
    requeue();

    let result = event_loop.run_until_done();
    assert!(matches!(
        result,
        Err(EventLoopError::MicrotaskLimitExceeded { limit: 50, .. })
    ));
}

#[test]
fn failures_before_microtask_limit_reach_uncaught_errors() {
    let config = EventLoopConfig {
        microtask_limit: Some(2),
        ..EventLoopConfig::default()
    };
    let mut event_loop = EventLoop::with_config(config);
    event_loop.enqueue_microtask(MicroTask::new(|| Err(RuntimeError::custom("job failed"))));
    for _ in 0..3 {
        event_loop.enqueue_microtask(MicroTask::infallible(|| {}));
    }

    let result = event_loop.run_all_microtasks();
    assert!(matches!(
        result,
        Err(EventLoopError::MicrotaskLimitExceeded { limit: 2, .. })
    ));
    assert_eq!(event_loop.uncaught_errors(), &[RuntimeError::custom("job failed")]);
    assert!(!event_loop.is_microtask_queue_empty());
}

#[test]
fn panicking_handler_is_recorded_and_loop_continues() {
    let mut event_loop = EventLoop::new();
    let results = recorder();

    let stuck = Promise::<i32, RuntimeError>::resolved(1)
        .then(|_: i32| -> Result<i32, RuntimeError> { panic!("handler exploded") });
    let r = results.clone();
    event_loop.enqueue_task(Task::new(move || {
        r.borrow_mut().push(1);
        Ok(())
    }));

    event_loop.run_until_done().unwrap();
    assert_eq!(*results.borrow(), vec![1]);
    assert_eq!(stuck.state(), PromiseState::Pending);
    assert_eq!(event_loop.uncaught_errors().len(), 1);
    assert!(event_loop.uncaught_errors()[0]
        .message
        .contains("handler exploded"));
}

#[test]
fn run_until_settled_returns_outcome() {
    let mut event_loop = EventLoop::new();
    let handle = event_loop.handle();

    let promise: Promise<&str, RuntimeError> = Promise::new(|resolver| {
        handle.set_timeout(
            Duration::from_millis(100),
            Task::new(move || {
                resolver.resolve("done");
                Ok(())
            }),
        );
        Ok(())
    });

    let outcome = event_loop.run_until_settled(&promise).unwrap();
    assert_eq!(outcome, Some(Settlement::Fulfilled { value: "done" }));
    assert_eq!(promise.state(), PromiseState::Fulfilled);
}

#[test]
fn run_until_settled_gives_up_when_idle() {
    let mut event_loop = EventLoop::new();
    let (promise, _resolver) = Promise::<i32, RuntimeError>::pending();
    assert_eq!(event_loop.run_until_settled(&promise).unwrap(), None);
}
