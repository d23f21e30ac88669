//! # feedq
//!
//! CLI tool for the feedq reconciliation engine.
//!
//! ## Commands
//!
//! - `diff`: Print the queue intents between two feed snapshots
//! - `replay`: Run a scripted editing session against a mock server
//!
//! ## Example
//!
//! ```bash
//! # What would a heartbeat queue?
//! feedq diff --local 1,2,3 --local-pinned 2 --remote 1,3,4
//!
//! # Replay a session with custom timings
//! feedq --config feedq.toml replay demos/session.json
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::{diff, replay};
use config::Config;

/// CLI tool for the feedq reconciliation engine.
#[derive(Parser, Debug)]
#[command(name = "feedq")]
#[command(version, about, long_about = None)]
struct Cli {
    /// TOML file with heartbeat, search and fetch settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level (overrides RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the insert/remove intents that take a local feed to a remote one
    Diff {
        /// Comma-separated unpinned ids shown locally
        #[arg(long, default_value = "")]
        local: String,

        /// Comma-separated pinned ids shown locally
        #[arg(long, default_value = "")]
        local_pinned: String,

        /// Comma-separated unpinned ids reported by the server
        #[arg(long, default_value = "")]
        remote: String,

        /// Comma-separated pinned ids reported by the server
        #[arg(long, default_value = "")]
        remote_pinned: String,
    },

    /// Replay a JSON session script against a mock server
    Replay {
        /// Path to the script file
        script: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => Config::from_file(path).context("Failed to load config")?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Diff {
            local,
            local_pinned,
            remote,
            remote_pinned,
        } => {
            diff::run(&local, &local_pinned, &remote, &remote_pinned);
        }
        Commands::Replay { script } => {
            replay::run(&script, &config).await?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
