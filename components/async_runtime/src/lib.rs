//! Promise runtime built on a microtask queue.
//!
//! This crate provides the async building blocks of a single-threaded,
//! cooperative runtime:
//! - A per-thread microtask queue drained between synchronous turns
//! - A Promise implementation following the Promise/A+ model
//! - Promise combinators (`all`, `all_settled`, `race`, `any`)
//! - An event loop with tasks, virtual-time timers and unhandled rejection reporting
//!
//! # Overview
//!
//! - [`Promise`] - Single-assignment eventual result with chaining
//! - [`microtask`] - The FIFO job queue promise reactions run on
//! - [`EventLoop`] - Host scheduler coordinating tasks and microtasks
//!
//! # Examples
//!
//! ## Event Loop Usage
//!
//! ```
//! use async_runtime::{EventLoop, Task};
//!
//! let mut event_loop = EventLoop::new();
//! event_loop.enqueue_task(Task::new(|| Ok(())));
//! event_loop.run_until_done().unwrap();
//! ```
//!
//! ## Promise Usage
//!
//! ```
//! use async_runtime::{EventLoop, Promise, PromiseState};
//! use core_types::RuntimeError;
//!
//! let promise: Promise<i32, RuntimeError> = Promise::new(|resolver| {
//!     resolver.resolve(1);
//!     Ok(())
//! });
//! let result = promise
//!     .then(|x| Ok(x * 2))
//!     .then(|x| Ok(x * 2))
//!     .then(|x| Ok(x * 2));
//!
//! let mut event_loop = EventLoop::new();
//! event_loop.run_until_done().unwrap();
//! assert_eq!(result.state(), PromiseState::Fulfilled);
//! assert_eq!(result.value(), Some(8));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod combinators;
pub mod config;
pub mod error;
pub mod event_loop;
pub mod microtask;
pub mod promise;
pub mod rejection;
pub mod task_queue;
pub mod timer;

// Re-export main types at crate root
pub use combinators::{all, all_settled, any, race, reject, resolve};
pub use config::EventLoopConfig;
pub use error::EventLoopError;
pub use event_loop::{EventLoop, LoopHandle};
pub use promise::{
    OnFulfilled, OnRejected, Promise, PromiseState, Resolution, Resolver, Settlement,
};
pub use rejection::UnhandledRejection;
pub use task_queue::{JobQueue, MicroTask, MicrotaskQueue, Task, TaskQueue};
pub use timer::{delay, timeout, TimerId, TimerQueue};
