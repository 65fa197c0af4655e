//! Error types shared by the promise runtime.
//!
//! [`RuntimeError`] is the general-purpose rejection reason and job failure
//! type. [`AggregateError`] collects every rejection reason when a
//! first-fulfillment combinator runs out of candidates.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The kind of runtime error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// A value had the wrong shape for the operation
    TypeError,
    /// A value was outside the allowed range
    RangeError,
    /// An operation did not settle before its deadline
    Timeout,
    /// Application-level failure raised by user code
    Custom,
    /// Internal runtime error
    InternalError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::TypeError => "TypeError",
            ErrorKind::RangeError => "RangeError",
            ErrorKind::Timeout => "TimeoutError",
            ErrorKind::Custom => "Error",
            ErrorKind::InternalError => "InternalError",
        };
        f.write_str(name)
    }
}

/// An error raised by an executor, handler, task or microtask.
///
/// # Examples
///
/// ```
/// use core_types::{ErrorKind, RuntimeError};
///
/// let error = RuntimeError::type_error("not a function");
/// assert_eq!(error.kind, ErrorKind::TypeError);
/// assert_eq!(error.to_string(), "TypeError: not a function");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct RuntimeError {
    /// The type of error
    pub kind: ErrorKind,
    /// Human-readable error message
    pub message: String,
}

impl RuntimeError {
    /// Creates an error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Creates a [`ErrorKind::TypeError`].
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeError, message)
    }

    /// Creates a [`ErrorKind::RangeError`].
    pub fn range_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RangeError, message)
    }

    /// Creates a [`ErrorKind::Timeout`].
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    /// Creates a [`ErrorKind::Custom`] error for user code.
    pub fn custom(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Custom, message)
    }

    /// Creates a [`ErrorKind::InternalError`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InternalError, message)
    }
}

/// Result alias for fallible jobs.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Every rejection reason of a group of promises, in input order.
///
/// # Examples
///
/// ```
/// use core_types::AggregateError;
///
/// let error = AggregateError::new(vec!["a", "b"]);
/// assert_eq!(error.len(), 2);
/// assert_eq!(error.to_string(), "all 2 promises were rejected");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("all {} promises were rejected", errors.len())]
pub struct AggregateError<E: fmt::Debug> {
    /// The collected reasons
    pub errors: Vec<E>,
}

impl<E: fmt::Debug> AggregateError<E> {
    /// Wraps the collected reasons.
    pub fn new(errors: Vec<E>) -> Self {
        Self { errors }
    }

    /// Number of collected reasons.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// True when no reason was collected (an empty input group).
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}
