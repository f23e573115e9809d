//! Vantage CLI - Media slot simulator
//!
//! Features:
//! - Scroll trace replay on a virtual clock
//! - Configuration preset listing
//! - Network-to-preload strategy inspection

use clap::{Parser, Subcommand};
use output::OutputFormat;
use std::path::PathBuf;

mod commands;
mod output;
mod simulate;
mod trace;

/// Vantage CLI - Viewport media loading toolkit
#[derive(Parser)]
#[command(name = "vantage")]
#[command(author = "Unravel Engineering")]
#[command(version)]
#[command(about = "Simulate and inspect viewport-driven media loading", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json, table)
    #[arg(short, long, default_value = "text")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scroll trace against simulated media slots
    Simulate {
        /// Path to a trace JSON file
        trace: PathBuf,
    },

    /// Show configuration presets
    Presets,

    /// Show the preload strategy for given network conditions
    Strategy {
        /// Effective connection type (slow-2g, 2g, 3g, 4g, unknown)
        #[arg(short, long, default_value = "4g")]
        effective_type: String,

        /// Data saver is enabled
        #[arg(long)]
        save_data: bool,

        /// Do not downgrade when data saver is enabled
        #[arg(long)]
        ignore_data_saver: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_writer(std::io::stderr)
        .init();

    let format = OutputFormat::from(cli.format.as_str());

    match cli.command {
        Commands::Simulate { trace } => {
            commands::simulate(&trace, format).await?;
        }
        Commands::Presets => {
            commands::presets(format)?;
        }
        Commands::Strategy { effective_type, save_data, ignore_data_saver } => {
            commands::strategy(&effective_type, save_data, ignore_data_saver, format)?;
        }
    }

    Ok(())
}
