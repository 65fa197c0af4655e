//! Core error types for the promise runtime.
//!
//! This crate provides the error vocabulary shared by the async runtime and
//! the demo CLI.
//!
//! # Overview
//!
//! - [`RuntimeError`] - Errors raised by executors, handlers and jobs
//! - [`ErrorKind`] - Types of runtime errors
//! - [`AggregateError`] - Collected rejection reasons of a promise group
//!
//! # Examples
//!
//! ```
//! use core_types::{ErrorKind, RuntimeError};
//!
//! let error = RuntimeError::new(ErrorKind::TypeError, "undefined is not a function");
//! assert_eq!(error.to_string(), "TypeError: undefined is not a function");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod error;

pub use error::{AggregateError, ErrorKind, RuntimeError, RuntimeResult};
