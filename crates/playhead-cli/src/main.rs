//! Playhead CLI - Headless playback session simulator
//!
//! Features:
//! - Replay a scripted session against stub engines
//! - Classify a single raw signal
//! - Validate session configuration files

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod output;
mod simulator;

/// Playhead CLI - Playback session toolkit
#[derive(Parser)]
#[command(name = "playhead-cli")]
#[command(author = "Purple Squirrel Media")]
#[command(version)]
#[command(about = "Playback session simulator and signal classifier", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scripted session and print its tracking events
    Simulate {
        /// Path to the scenario JSON file
        scenario: PathBuf,

        /// Session configuration JSON file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Classify one raw signal against a freshly loaded video
    Classify {
        /// Raw signal as JSON
        signal: String,

        /// Treat the video as a live stream
        #[arg(long)]
        live: bool,

        /// Video duration in microseconds
        #[arg(short, long, default_value = "600000000")]
        duration: i64,

        /// Ad tracking metadata is known for the video
        #[arg(long)]
        tracked: bool,
    },

    /// Show the effective session configuration
    Config {
        /// Configuration file to validate (defaults are shown otherwise)
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_writer(std::io::stderr)
        .init();

    playhead_core::init();

    match cli.command {
        Commands::Simulate { scenario, config } => {
            commands::simulate(&scenario, config.as_deref(), &cli.format).await?;
        }
        Commands::Classify { signal, live, duration, tracked } => {
            commands::classify(&signal, live, duration, tracked, &cli.format)?;
        }
        Commands::Config { file } => {
            commands::config(file.as_deref(), &cli.format)?;
        }
    }

    Ok(())
}
