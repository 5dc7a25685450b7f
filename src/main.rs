//! fare-scan - Round-trip airfare calendar scanner CLI

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use fare_scan::commands::ScanCommand;
use fare_scan::config::{Config, OutputFormat, SourceKind};
use fare_scan::grid::{DateWindow, Route, StayRange};
use fare_scan::skyscanner::Market;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "fare-scan",
    version,
    about = "Round-trip airfare calendar scanner",
    long_about = "Scans round-trip fares across a departure-date/stay-length grid \
                  and flags cells that are cheap against their weekday or weekend peers."
)]
struct Cli {
    /// Skyscanner market to scan
    #[arg(short, long, default_value = "kr", global = true, env = "FARE_MARKET")]
    market: Market,

    /// Proxy URL (e.g., socks5://host:port)
    #[arg(long, global = true, env = "FARE_PROXY")]
    proxy: Option<String>,

    /// Delay between lookups in milliseconds
    #[arg(long, global = true, env = "FARE_DELAY")]
    delay: Option<u64>,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "table", global = true)]
    format: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan fares for a route
    #[command(alias = "s")]
    Scan {
        /// Origin airport or city code
        origin: String,

        /// Destination airport or city code
        destination: String,

        /// First candidate departure date (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,

        /// Number of candidate departure dates
        #[arg(long, default_value = "7")]
        days: u32,

        /// Minimum stay in nights
        #[arg(long, default_value = "3")]
        min_stay: u32,

        /// Maximum stay in nights
        #[arg(long, default_value = "5")]
        max_stay: u32,

        /// Price source to use
        #[arg(long)]
        source: Option<SourceKind>,

        /// Concurrent lookup workers
        #[arg(long)]
        concurrency: Option<usize>,

        /// Cheapest fraction of each peer group flagged as cheap
        #[arg(long)]
        percentile: Option<f64>,

        /// Fare API key (for --source api)
        #[arg(long, env = "FARE_API_KEY")]
        api_key: Option<String>,
    },

    /// Offline scan against the synthetic source
    Demo {
        /// Origin airport or city code
        #[arg(default_value = "ICN")]
        origin: String,

        /// Destination airport or city code
        #[arg(default_value = "NRT")]
        destination: String,

        /// First candidate departure date (YYYY-MM-DD)
        #[arg(long, default_value = "2026-05-01")]
        start: NaiveDate,

        /// Number of candidate departure dates
        #[arg(long, default_value = "7")]
        days: u32,

        /// Minimum stay in nights
        #[arg(long, default_value = "3")]
        min_stay: u32,

        /// Maximum stay in nights
        #[arg(long, default_value = "5")]
        max_stay: u32,
    },

    /// List supported markets
    Markets,
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
    config.market = cli.market;
    config.format = cli.format;

    if let Some(delay) = cli.delay {
        config.delay_ms = delay;
    }
    if let Some(proxy) = cli.proxy {
        config.proxy = Some(proxy);
    }

    match cli.command {
        Commands::Scan {
            origin,
            destination,
            start,
            days,
            min_stay,
            max_stay,
            source,
            concurrency,
            percentile,
            api_key,
        } => {
            if let Some(source) = source {
                config.source = source;
            }
            if let Some(concurrency) = concurrency {
                config.max_concurrency = concurrency;
            }
            if let Some(percentile) = percentile {
                config.percentile = percentile;
            }
            if let Some(key) = api_key {
                config.api_key = Some(key);
            }

            let route = Route::new(&origin, &destination);
            let window = DateWindow::new(start, days);
            let stay = StayRange::new(min_stay, max_stay);

            let cmd = ScanCommand::new(config);
            let output = cmd.execute(&route, &window, &stay).await?;
            println!("{}", output);
        }

        Commands::Demo { origin, destination, start, days, min_stay, max_stay } => {
            config.source = SourceKind::Synthetic;

            let route = Route::new(&origin, &destination);
            let window = DateWindow::new(start, days);
            let stay = StayRange::new(min_stay, max_stay);

            let cmd = ScanCommand::new(config);
            let output = cmd.execute(&route, &window, &stay).await?;
            println!("{}", output);
        }

        Commands::Markets => {
            println!("Supported Skyscanner markets:\n");
            println!("{:<6} {:<26} {:<10}", "Code", "Domain", "Currency");
            println!("{:-<6} {:-<26} {:-<10}", "", "", "");

            for market in Market::all() {
                println!(
                    "{:<6} {:<26} {:<10}",
                    market.to_string(),
                    market.domain(),
                    market.currency()
                );
            }
        }
    }

    Ok(())
}
