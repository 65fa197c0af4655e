//! Event loop configuration.
//!
//! Configuration is plain JSON, e.g.
//!
//! ```json
//! { "microtask_limit": 10000, "report_unhandled_rejections": true }
//! ```
//!
//! Every field is optional and falls back to [`EventLoopConfig::default`].

use crate::error::EventLoopError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default upper bound on jobs run by a single microtask checkpoint.
pub const DEFAULT_MICROTASK_LIMIT: usize = 1_000_000;

/// Tunables for [`EventLoop`](crate::EventLoop).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EventLoopConfig {
    /// Maximum number of microtasks drained in one checkpoint. `None` disables
    /// the guard; a job that endlessly re-enqueues itself then never yields.
    pub microtask_limit: Option<usize>,
    /// Log each unhandled rejection at `warn` when it is detected.
    pub report_unhandled_rejections: bool,
}

impl Default for EventLoopConfig {
    fn default() -> Self {
        Self {
            microtask_limit: Some(DEFAULT_MICROTASK_LIMIT),
            report_unhandled_rejections: true,
        }
    }
}

impl EventLoopConfig {
    /// Parses a configuration from a JSON document.
    ///
    /// # Examples
    ///
    /// ```
    /// use async_runtime::EventLoopConfig;
    ///
    /// let config = EventLoopConfig::from_json_str(r#"{"microtask_limit": null}"#).unwrap();
    /// assert_eq!(config.microtask_limit, None);
    /// assert!(config.report_unhandled_rejections);
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self, EventLoopError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EventLoopError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&text)?;
        tracing::debug!(path = %path.as_ref().display(), ?config, "loaded event loop config");
        Ok(config)
    }
}
