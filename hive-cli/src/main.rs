//! Hive CLI - Command-line interface
//!
//! Commands:
//! - selfplay: Let the engine play a game against itself
//! - perft: Count move sequences from a position
//! - init-config: Write a default engine configuration

mod perft;
mod selfplay;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use hive_core::{EngineConfig, RuleSet};

#[derive(Parser)]
#[command(name = "hive")]
#[command(about = "Hive rules engine and search")]
struct Cli {
    /// Random seed for reproducible runs
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a game between two copies of the engine
    Selfplay(selfplay::SelfplayArgs),
    /// Count move sequences to a fixed depth
    Perft(perft::PerftArgs),
    /// Write a default engine configuration file
    InitConfig {
        #[arg(long, value_name = "FILE")]
        output: PathBuf,
        #[arg(long, default_value = "standard")]
        ruleset: RuleSet,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Selfplay(args) => selfplay::run(args, cli.seed),
        Commands::Perft(args) => perft::run(args),
        Commands::InitConfig { output, ruleset } => {
            let config = EngineConfig { ruleset, ..EngineConfig::default() };
            config
                .save(&output)
                .with_context(|| format!("Failed to write config: {}", output.display()))?;
            tracing::info!("Wrote {} configuration to {}", ruleset, output.display());
            Ok(())
        }
    }
}
