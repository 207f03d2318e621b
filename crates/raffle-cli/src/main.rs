//! Raffle CLI
//!
//! Command-line interface for running local raffle simulations and inspecting
//! the resolved engine configuration.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

/// Time-interval raffle with verifiable randomness and atomic payout
#[derive(Parser)]
#[command(name = "raffle")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path
    #[arg(short, long, global = true, env = "RAFFLE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run rounds against a local VRF provider and in-memory ledger
    Simulate {
        /// Entries per round
        #[arg(short, long, default_value_t = 5)]
        players: usize,

        /// Number of rounds to settle
        #[arg(short, long, default_value_t = 3)]
        rounds: u64,

        /// Seed for the local VRF provider
        #[arg(short, long, default_value_t = 0)]
        seed: u64,

        /// Amount paid above the entrance fee by every entry
        #[arg(long, default_value_t = 0)]
        overpay: u64,
    },

    /// Print the resolved configuration as JSON
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = commands::load_config(cli.config)?;

    // Initialize logging
    let filter = if cli.verbose {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    };
    if config.logging.json_output {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    match cli.command {
        Commands::Simulate {
            players,
            rounds,
            seed,
            overpay,
        } => commands::simulate::run(&config, players, rounds, seed, overpay),
        Commands::Config => commands::config::run(&config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn simulate_flags_parse() {
        let cli = Cli::try_parse_from([
            "raffle", "simulate", "--players", "4", "--rounds", "2", "--seed", "9", "--overpay",
            "3",
        ])
        .unwrap();
        match cli.command {
            Commands::Simulate {
                players,
                rounds,
                seed,
                overpay,
            } => assert_eq!((players, rounds, seed, overpay), (4, 2, 9, 3)),
            Commands::Config => panic!("expected simulate"),
        }
    }
}
