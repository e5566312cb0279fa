//! # copilotkit-cli
//!
//! Command-line interface for the CopilotKit runtime core.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use copilotkit_core::Config;

mod commands;

/// Application context containing shared state.
pub struct AppContext {
    pub config: Config,
}

/// CopilotKit - tool merging and agent follow-up runs
#[derive(Parser)]
#[command(name = "copilotkit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge server and client tool definitions
    Merge {
        /// JSON file with the server tool definitions
        server: PathBuf,
        /// JSON file with the client tool definitions
        client: Option<PathBuf>,
        /// Read the client file as legacy actions
        #[arg(long)]
        legacy_client: bool,
    },
    /// Replay a scripted agent through the follow-up loop
    Replay {
        /// JSON script with tools and agent turns
        script: PathBuf,
        /// Override the follow-up cap
        #[arg(long, conflicts_with = "unbounded")]
        max_follow_ups: Option<usize>,
        /// Disable the follow-up cap
        #[arg(long)]
        unbounded: bool,
        /// Read the tool registry live instead of from a snapshot
        #[arg(long)]
        live: bool,
        /// Print the full agent history instead of the final messages
        #[arg(long)]
        history: bool,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// List the configuration files that are consulted
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load before logging so the configured level applies
    let loaded = Config::load();
    let level = match (&loaded, cli.verbose) {
        (_, true) => "debug".to_string(),
        (Ok(config), false) => config.logging.level.clone(),
        (Err(_), false) => "info".to_string(),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::new(level))
        .init();

    let config = loaded.unwrap_or_else(|e| {
        tracing::warn!("Failed to load config, using defaults: {}", e);
        Config::default()
    });

    let ctx = AppContext { config };

    match cli.command {
        Commands::Merge {
            server,
            client,
            legacy_client,
        } => {
            commands::merge::run(&server, client.as_deref(), legacy_client)?;
        }
        Commands::Replay {
            script,
            max_follow_ups,
            unbounded,
            live,
            history,
        } => {
            let overrides = commands::replay::Overrides {
                max_follow_ups,
                unbounded,
                live,
            };
            commands::replay::run(&script, overrides, history, &ctx).await?;
        }
        Commands::Config { action } => {
            commands::config::handle(action, &ctx)?;
        }
        Commands::Version => {
            println!("copilotkit {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
