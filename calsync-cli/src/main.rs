mod commands;
mod notify;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "calsync")]
#[command(about = "Sync your SJTU calendar to a CalDAV-style store")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one sync now
    Sync,
    /// Keep syncing in the background on a timer
    Watch,
    /// Parse free-form text into events and upload them
    Add {
        /// The text to parse, e.g. "组会明天下午三点 A301"
        text: Vec<String>,
    },
    /// Show when the last sync happened and where things live
    Status,
    /// Show configuration paths
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    match cli.command {
        Commands::Sync => commands::sync::run().await,
        Commands::Watch => commands::watch::run().await,
        Commands::Add { text } => commands::add::run(&text.join(" ")).await,
        Commands::Status => commands::status::run(),
        Commands::Config => commands::config::run(),
    }
}

// Logs go to stderr so stdout stays clean for command output.
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}
