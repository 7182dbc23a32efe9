//! Drip scenario runner.
//!
//! Creates one distribution through a factory, replays a timeline of calls
//! against an in-memory token ledger and prints a JSON report.

mod runner;
mod scenario;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::info;

use drip_core::types::{Address, Timestamp};

#[derive(Parser, Debug)]
#[command(name = "drip", version, about = "Replay staking reward distribution scenarios")]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Log output format ("text" or "json")
    #[arg(long, default_value = "text", global = true)]
    log_format: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a scenario and print the report
    Run {
        /// Scenario file (TOML, JSON or YAML)
        scenario: PathBuf,

        /// Write the report here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,

        /// Exit with an error if any step failed
        #[arg(long)]
        strict: bool,
    },
    /// Check a scenario's distribution configuration without running it
    Validate {
        scenario: PathBuf,
    },
    /// Replay a scenario, then print an account's claimable reward
    Claimable {
        scenario: PathBuf,

        /// Account to query (0x-prefixed hex)
        #[arg(long)]
        account: Address,

        /// Timestamp to project to
        #[arg(long)]
        at: Timestamp,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, &cli.log_format);

    match cli.command {
        Command::Run { scenario, output, strict } => {
            let loaded = scenario::load(&scenario)?;
            let report = runner::run(&loaded)?;
            let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
            match output {
                Some(path) => fs::write(&path, json)
                    .with_context(|| format!("Failed to write report: {}", path.display()))?,
                None => println!("{json}"),
            }
            let failed = report.failed_steps();
            info!(steps = report.steps.len(), failed, "scenario finished");
            if strict && failed > 0 {
                bail!("{failed} step(s) failed");
            }
        }
        Command::Validate { scenario } => {
            let loaded = scenario::load(&scenario)?;
            let config = loaded.distribution.to_config();
            config
                .validate(loaded.distribution.created_at)
                .context("Invalid distribution configuration")?;
            println!(
                "ok: {} reward over {}s, {} action(s)",
                config.reward_amount,
                config.seconds_duration(),
                loaded.actions.len()
            );
        }
        Command::Claimable { scenario, account, at } => {
            let loaded = scenario::load(&scenario)?;
            println!("{}", runner::claimable_after(&loaded, &account, at)?);
        }
    }
    Ok(())
}

/// Initialize tracing subscriber with the given log level and output format.
///
/// Logs go to stderr so reports on stdout stay machine-readable.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true).with_writer(std::io::stderr))
            .init();
    }
}
