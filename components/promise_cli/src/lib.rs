//! Promise demo CLI library
//!
//! Provides the argument parser and the narrated scenarios behind the
//! `promise-demo` binary.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cli;
pub mod error;
pub mod scenarios;

pub use cli::{Cli, Command};
pub use error::{CliError, CliResult};
pub use scenarios::{run_scenario, Scenario, Transcript};
