//! Parley CLI, the main entry point.
//!
//! Commands:
//! - `chat`     Interactive chat or single-message mode
//! - `history`  Print the stored conversation
//! - `export`   Write the conversation to a JSON file
//! - `clear`    Delete the stored conversation
//! - `status`   Show configuration and history usage
//! - `onboard`  Write the default config file

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "parley",
    about = "Parley, a terminal chat client for hosted language models",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the model
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Print the stored conversation
    History {
        /// Only show the most recent N messages
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Export the conversation as JSON
    Export {
        /// Output file (defaults to ai-chat-export-YYYY-MM-DD.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Delete the stored conversation
    Clear,

    /// Show configuration and history usage
    Status,

    /// Write the default configuration file
    Onboard,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Chat { message } => commands::chat::run(message).await?,
        Commands::History { limit } => commands::history::run(limit).await?,
        Commands::Export { output } => commands::export::run(output).await?,
        Commands::Clear => commands::clear::run().await?,
        Commands::Status => commands::status::run().await?,
        Commands::Onboard => commands::onboard::run().await?,
    }

    Ok(())
}
