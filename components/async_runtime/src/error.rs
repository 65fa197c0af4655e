//! Errors raised by the scheduler itself.
//!
//! Failures of individual jobs are not errors of the loop: they are logged
//! and recorded, and draining continues.

use core_types::RuntimeError;
use thiserror::Error;

/// Errors returned by the event loop and the microtask checkpoint.
#[derive(Debug, Error)]
pub enum EventLoopError {
    /// A single checkpoint ran more microtasks than the configured limit.
    #[error("microtask checkpoint exceeded the limit of {limit} jobs")]
    MicrotaskLimitExceeded {
        /// The configured limit
        limit: usize,
        /// Failures of the jobs that did run before the limit tripped
        failures: Vec<RuntimeError>,
    },

    /// The loop configuration could not be parsed.
    #[error("invalid event loop config: {0}")]
    Config(#[from] serde_json::Error),

    /// The loop configuration file could not be read.
    #[error("failed to read event loop config: {0}")]
    Io(#[from] std::io::Error),
}
