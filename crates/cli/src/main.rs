//! `evseal` command-line entry point.
//!
//! Startup sequence:
//! 1. Parse command-line arguments.
//! 2. Load and validate [`config::Config`] from environment variables.
//! 3. Initialise structured logging on stderr.
//! 4. Run the requested subcommand.

mod commands;
mod config;
mod telemetry;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use commands::Command;
use config::Config;

#[derive(Debug, Parser)]
#[command(name = "evseal", version, about = "Encrypt values into self-describing EV[...] envelopes")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

fn main() -> Result<ExitCode> {
    // -----------------------------------------------------------------------
    // 1. Arguments
    // -----------------------------------------------------------------------
    let cli = Cli::parse();

    // -----------------------------------------------------------------------
    // 2. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 3. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init(&cfg.log_level, cfg.log_format == "json")?;
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), ?cfg, "evseal starting");

    // -----------------------------------------------------------------------
    // 4. Command
    // -----------------------------------------------------------------------
    cli.command.run(&cfg)
}
