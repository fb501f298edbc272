//! opsdesk CLI
//!
//! Runs facility operations actions (device resets, door unlocks,
//! escalations) through the action dispatcher from the command line.

mod commands;
mod config;
mod telemetry;
mod wiring;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::OpsdeskConfig;

/// opsdesk CLI: execute facility operations actions.
#[derive(Parser, Debug)]
#[command(name = "opsdesk", version, about)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, env = "OPSDESK_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Output format.
    #[arg(long, default_value = "text", global = true)]
    format: OutputFormat,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute one action for a thread.
    Execute(commands::execute::ExecuteArgs),
    /// Run a thread's SOP, falling back when the primary action fails.
    Sop(commands::sop::SopArgs),
    /// Show registered handlers, circuit breakers and counters.
    Health,
    /// List registered action types.
    Handlers,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    telemetry::init(cli.json_logs);

    let config = OpsdeskConfig::load(cli.config.as_deref())?;
    let dispatcher = wiring::build_dispatcher(&config)?;

    match cli.command {
        Command::Execute(args) => commands::execute::run(&dispatcher, &args, &cli.format).await,
        Command::Sop(args) => commands::sop::run(&dispatcher, &args, &cli.format).await,
        Command::Health => commands::health::run(&dispatcher, &cli.format),
        Command::Handlers => commands::handlers::run(&dispatcher, &cli.format),
    }
}
