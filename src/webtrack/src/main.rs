//! webtrack: replay recorded pages through the behavioral tracker.
//!
//! Records go to stdout as JSON lines; logs go to stderr.

mod replay;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{info, warn};
use webtrack_core::TrackerConfig;

#[derive(Parser, Debug)]
#[command(name = "webtrack")]
#[command(about = "Replay page fixtures through the behavioral tracker")]
#[command(version)]
struct Cli {
    /// TOML config file (environment variables still override it)
    #[arg(long, env = "WEBTRACK_CONFIG")]
    config: Option<PathBuf>,

    /// Session cookie name (overrides config)
    #[arg(long, env = "WEBTRACK__COOKIE_NAME")]
    cookie_name: Option<String>,

    /// Leave multi-token element ids untouched while addressing
    #[arg(long, default_value_t = false)]
    no_normalize_ids: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a fixture's interactions and print every emitted record
    Replay {
        /// Path to the page fixture (JSON)
        #[arg(short, long)]
        fixture: PathBuf,
    },

    /// Print the path of every element in a fixture's document
    Paths {
        /// Path to the page fixture (JSON)
        #[arg(short, long)]
        fixture: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "webtrack=info,webtrack_web_sdk=info".into()),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    // Load configuration
    let loaded = match &cli.config {
        Some(path) => TrackerConfig::load_from(path),
        None => TrackerConfig::load(),
    };
    let mut config = loaded.unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        TrackerConfig::default()
    });

    // Apply CLI overrides
    if let Some(cookie_name) = cli.cookie_name {
        config.cookie_name = cookie_name;
    }
    if cli.no_normalize_ids {
        config.normalize_identifiers = false;
    }

    info!(
        cookie_name = %config.cookie_name,
        cookie_path = %config.cookie_path,
        normalize_identifiers = config.normalize_identifiers,
        "Configuration loaded"
    );

    match cli.command {
        Commands::Replay { fixture } => {
            let page = replay::load_fixture(&fixture)?;
            replay::replay(&page, config, Arc::new(replay::StdoutTransport))?;
        }
        Commands::Paths { fixture } => {
            let page = replay::load_fixture(&fixture)?;
            for path in replay::list_paths(&page, &config)? {
                println!("{path}");
            }
        }
    }

    Ok(())
}
