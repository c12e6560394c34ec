//! geizhals-watch - Geizhals price range monitor
//!
//! Checks and polls Geizhals product pages with TLS fingerprint emulation.

use anyhow::Result;
use clap::{Parser, Subcommand};
use geizhals_watch::commands::{CheckCommand, WatchCommand};
use geizhals_watch::config::{Config, OutputFormat};
use geizhals_watch::geizhals::site;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "geizhals-watch",
    version,
    about = "Geizhals price range monitor",
    long_about = "Tracks the minimum and maximum price of a geizhals.at or geizhals.de product page."
)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Proxy URL (e.g., socks5://host:port)
    #[arg(long, global = true, env = "GEIZHALS_PROXY")]
    proxy: Option<String>,

    /// Output format
    #[arg(short, long, global = true)]
    format: Option<OutputFormat>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a product page once and print its price range
    #[command(alias = "c")]
    Check {
        /// Geizhals product page URL
        url: String,
    },

    /// Poll a product page until interrupted
    #[command(alias = "w")]
    Watch {
        /// Geizhals product page URL (defaults to `url` from the config)
        url: Option<String>,

        /// Seconds between two refreshes
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Print the canonical URL that would be fetched
    Validate {
        /// Geizhals product page URL
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    // Load config with layered overrides
    let mut config = Config::load(cli.config.as_deref())?.with_env();

    // Apply CLI overrides
    if let Some(format) = cli.format {
        config.format = format;
    }

    if let Some(proxy) = cli.proxy {
        config.proxy = Some(proxy);
    }

    match cli.command {
        Commands::Check { url } => {
            let cmd = CheckCommand::new(config);
            let output = cmd.execute(&url).await?;
            println!("{}", output);
        }

        Commands::Watch { url, interval } => {
            if let Some(secs) = interval {
                config.interval_secs = secs;
            }

            let cmd = WatchCommand::new(config);
            cmd.execute(url.as_deref()).await?;
        }

        Commands::Validate { url } => {
            let target = site::validate(&url)?;
            println!("{}", target);
        }
    }

    Ok(())
}
