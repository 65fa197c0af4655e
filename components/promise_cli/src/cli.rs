//! Command-line arguments

use crate::scenarios::Scenario;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Runs narrated promise and microtask scenarios on the event loop.
#[derive(Debug, Parser)]
#[command(name = "promise-demo", version)]
pub struct Cli {
    /// Event loop config file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Print transcripts as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Log runtime internals at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// What to do
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// List available scenarios
    List,
    /// Run one scenario
    Run {
        /// Scenario to run
        #[arg(value_enum)]
        scenario: Scenario,
    },
    /// Run every scenario in order
    All,
}
