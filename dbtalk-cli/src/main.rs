//! dbtalk CLI
//!
//! Binary entry point. Provides two modes:
//! - `chat` (default): interactive REPL for asking questions against the
//!   configured databases
//! - `config`: configuration management

mod commands;

use anyhow::Result;
use clap::Parser;

use dbtalk_core::config::DbtalkConfig;

use crate::commands::chat::run_chat_mode;
use crate::commands::config::run_config_command;
use crate::commands::{Cli, Commands};

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() {
    // All logging goes to stderr so it never interleaves with the chat
    // transcript on stdout.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        // Print the full error chain for clear diagnostics
        eprintln!("❌ dbtalk fatal error: {}", e);
        for cause in e.chain().skip(1) {
            eprintln!("   caused by: {}", cause);
        }
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = if let Some(ref path) = cli.config {
        DbtalkConfig::load_from(path)
            .map_err(|e| anyhow::anyhow!("failed to load config from '{}': {}", path.display(), e))?
    } else {
        DbtalkConfig::load_default()?
    };

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => run_chat_mode(config).await,
        Commands::Config { action } => run_config_command(action, config),
    }
}
