//! Promise demo CLI
//!
//! Entry point for `promise-demo`. Parses CLI arguments, sets up logging and
//! runs the requested scenarios.

use async_runtime::EventLoopConfig;
use clap::Parser;
use promise_cli::{run_scenario, Cli, CliResult, Command, Scenario, Transcript};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(env_filter)
        .init();
}

fn print_transcript(transcript: &Transcript, json: bool) -> CliResult<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(transcript)?);
        return Ok(());
    }

    println!("== {}", transcript.scenario);
    for line in &transcript.lines {
        println!("  {line}");
    }
    for rejection in &transcript.unhandled_rejections {
        println!("  unhandled: {rejection}");
    }
    Ok(())
}

fn run(cli: Cli) -> CliResult<()> {
    let config = match &cli.config {
        Some(path) => EventLoopConfig::load(path)?,
        None => EventLoopConfig::default(),
    };

    match cli.command {
        Command::List => {
            for scenario in Scenario::all() {
                println!("{:<12} {}", scenario.name(), scenario.summary());
            }
        }
        Command::Run { scenario } => {
            let transcript = run_scenario(scenario, &config)?;
            print_transcript(&transcript, cli.json)?;
        }
        Command::All => {
            for scenario in Scenario::all() {
                let transcript = run_scenario(*scenario, &config)?;
                print_transcript(&transcript, cli.json)?;
            }
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(error) = run(cli) {
        tracing::error!(%error, "promise-demo failed");
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}
