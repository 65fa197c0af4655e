//! Error types for the CLI

use async_runtime::EventLoopError;
use thiserror::Error;

/// Errors that can occur while running demo scenarios
#[derive(Debug, Error)]
pub enum CliError {
    /// The event loop failed (bad config, runaway microtasks)
    #[error("event loop error: {0}")]
    EventLoop(#[from] EventLoopError),

    /// A scenario ended without producing its result
    #[error("scenario '{scenario}' did not settle")]
    Unsettled {
        /// Name of the scenario
        scenario: String,
    },

    /// Transcript could not be rendered as JSON
    #[error("failed to render transcript: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
