//! Huntercore CLI - run scripted and random chains through the game engine.

// Allow print in the CLI binary
#![allow(clippy::print_stdout, clippy::print_stderr)]

mod cli;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Huntercore - a deterministic consensus engine for an on-chain hunter game
#[derive(Parser, Debug)]
#[command(name = "huntercore")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Connect the blocks of a scenario file and print the outcome
    Simulate {
        /// Scenario JSON file
        #[arg(required = true)]
        scenario: PathBuf,

        /// Rules JSON file (overrides the scenario's rules)
        #[arg(short, long)]
        rules: Option<PathBuf>,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,

        /// Save the resulting chain to this directory
        #[arg(long)]
        store: Option<PathBuf>,
    },

    /// Run many random chains in parallel and check consensus properties
    Soak {
        /// Number of chains (default: 100)
        #[arg(short, long, default_value = "100")]
        chains: u64,

        /// Blocks per chain (default: 200)
        #[arg(short, long, default_value = "200")]
        blocks: u32,

        /// Starting seed (increments for each chain)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Parallel threads (default: CPU count)
        #[arg(short = 'j', long)]
        threads: Option<usize>,

        /// Rules JSON file (default: the small test map)
        #[arg(short, long)]
        rules: Option<PathBuf>,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,

        /// Show progress bar
        #[arg(short, long)]
        progress: bool,
    },

    /// Shortest waypoint path between two tiles
    #[command(allow_negative_numbers = true)]
    Path {
        /// Start column
        x0: i32,
        /// Start row
        y0: i32,
        /// Goal column
        x1: i32,
        /// Goal row
        y1: i32,

        /// Rules JSON file
        #[arg(short, long)]
        rules: Option<PathBuf>,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,
    },

    /// Minimum fees for a payload length
    Fee {
        /// Payload length in bytes
        length: usize,

        /// Rules JSON file
        #[arg(short, long)]
        rules: Option<PathBuf>,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let result = match args.command {
        Commands::Simulate {
            scenario,
            rules,
            format,
            store,
        } => cli::simulate::execute(&scenario, rules, format, store),

        Commands::Soak {
            chains,
            blocks,
            seed,
            threads,
            rules,
            format,
            progress,
        } => cli::soak::execute(cli::soak::SoakOptions {
            chains,
            blocks,
            seed,
            threads,
            rules,
            format,
            progress,
        }),

        Commands::Path {
            x0,
            y0,
            x1,
            y1,
            rules,
            format,
        } => cli::query::path((x0, y0), (x1, y1), rules.as_deref(), format),

        Commands::Fee { length, rules, format } => cli::query::fee(length, rules.as_deref(), format),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
