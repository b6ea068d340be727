//! Alpha Signal - tier-aware entry and rug-warning decisions for DEX pairs
//!
//! # WARNING
//! - Decisions are heuristics, not financial advice.
//! - Market data comes from a public API and may lag the chain.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::error;

// Use the library crate
use alpha_signal::cli::commands;
use alpha_signal::config::Config;

/// Alpha Signal - decision engine for DEX pairs
#[derive(Parser)]
#[command(name = "alphasig")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a pair from Dexscreener and print one decision
    Decide {
        /// Dexscreener pair or token URL
        #[arg(long)]
        url: String,

        /// Subscription tier: BASIC, PRO or PROPLUS
        #[arg(long, default_value = "BASIC", env = "ALPHA_TIER")]
        tier: String,
    },

    /// Evaluate a JSON overlay ("-" reads stdin)
    Eval {
        #[arg(long)]
        file: String,

        #[arg(long, default_value = "BASIC", env = "ALPHA_TIER")]
        tier: String,
    },

    /// Poll a pair and log a decision per poll
    Watch {
        #[arg(long)]
        url: String,

        #[arg(long, default_value = "BASIC", env = "ALPHA_TIER")]
        tier: String,

        /// Poll interval (default from config)
        #[arg(long)]
        interval_secs: Option<u64>,

        /// Stop after this many polls
        #[arg(long)]
        count: Option<u64>,
    },

    /// Show current configuration (secrets masked)
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("alpha_signal=info".parse()?);
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if cli.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    // Load configuration
    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    // Execute command
    let result = match cli.command {
        Commands::Decide { url, tier } => commands::decide(&config, &url, &tier).await,
        Commands::Eval { file, tier } => commands::eval(&config, &file, &tier).await,
        Commands::Watch {
            url,
            tier,
            interval_secs,
            count,
        } => commands::watch(&config, &url, &tier, interval_secs, count).await,
        Commands::Config => commands::show_config(&config),
    };

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
