//! Ratebook CLI
//!
//! Headless host for the exchange rate engine: refreshes the rate snapshot,
//! converts amounts and inspects the cached tables.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ratebook_common::{Currency, ExchangeRateSource};
use ratebook_fx::{FxEngine, FxEngineConfig};

/// Ratebook exchange rate CLI
#[derive(Parser, Debug)]
#[command(name = "ratebook")]
#[command(about = "Exchange rate cache and multi-provider currency converter")]
struct Args {
    /// Directory holding the rate snapshot
    #[arg(long, env = "RATEBOOK_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Rate endpoint URL
    #[arg(long, env = "RATEBOOK_URL")]
    url: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the latest rates and update the snapshot
    Refresh,

    /// Refresh periodically until interrupted
    Watch {
        /// Seconds between refreshes
        #[arg(long, default_value = "300")]
        interval: u64,
    },

    /// Convert an amount between two currencies
    Convert {
        amount: f64,

        #[arg(value_parser = parse_currency)]
        from: Currency,

        #[arg(value_parser = parse_currency)]
        to: Currency,

        /// Preferred rate provider
        #[arg(long, default_value = "ecb", value_parser = parse_source)]
        source: ExchangeRateSource,
    },

    /// Show cached rate tables
    Rates {
        /// Only show this provider
        #[arg(long, value_parser = parse_source)]
        source: Option<ExchangeRateSource>,
    },

    /// List known currencies
    Currencies,
}

fn parse_currency(code: &str) -> Result<Currency, String> {
    Currency::find(code).ok_or_else(|| format!("unknown currency code `{}`", code))
}

fn parse_source(name: &str) -> Result<ExchangeRateSource, String> {
    ExchangeRateSource::from_name(name).ok_or_else(|| {
        let known: Vec<_> = ExchangeRateSource::ALL.iter().map(|s| s.name()).collect();
        format!("unknown source `{}` (expected one of: {})", name, known.join(", "))
    })
}

fn init_logging(json: bool) {
    let filter = EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.json_logs);

    let mut config = FxEngineConfig::from_env();
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }
    if let Some(url) = args.url {
        config.endpoint_url = url;
    }

    let engine = Arc::new(FxEngine::from_config(config).context("Invalid configuration")?);

    match args.command {
        Command::Currencies => {
            for currency in Currency::all() {
                println!("{:<5} {:>2}  {}", currency.code(), currency.decimals(), currency.kind());
            }
        }
        Command::Rates { source } => {
            engine.load();
            print_rates(&engine, source);
        }
        Command::Convert {
            amount,
            from,
            to,
            source,
        } => {
            engine.load();
            let converted = engine.try_convert(amount, from, to, source)?;
            println!("{} {} = {} {}", amount, from, converted, to);
        }
        Command::Refresh => {
            engine.load();
            let summary = engine
                .refresh()
                .await
                .context("Refresh failed; cached rates were kept")?;
            let updated: Vec<_> = summary.updated.iter().map(|s| s.name()).collect();
            println!("updated: {}", updated.join(", "));
            if summary.skipped_rates > 0 || summary.unknown_sources > 0 {
                println!(
                    "skipped {} rates, {} unknown providers",
                    summary.skipped_rates, summary.unknown_sources
                );
            }
        }
        Command::Watch { interval } => {
            engine.load();
            watch(engine, Duration::from_secs(interval.max(1))).await;
        }
    }

    Ok(())
}

fn print_rates(engine: &FxEngine, only: Option<ExchangeRateSource>) {
    let sources = match only {
        Some(source) => vec![source],
        None => ExchangeRateSource::ALL.to_vec(),
    };

    for source in sources {
        match engine.exchange_rates(source) {
            Some(table) => {
                println!("{} ({} rates, as of {})", source, table.len(), table.updated_at());
                for rate in table.rates() {
                    println!("  {}/{}  {}", rate.from, rate.to, rate.rate);
                }
            }
            None => println!("{} (no rates)", source),
        }
    }
}

async fn watch(engine: Arc<FxEngine>, interval: Duration) {
    let mut updates = engine.subscribe();
    tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(event) => info!(sources = ?event.sources, at = %event.at, "Rates updated"),
                Err(RecvError::Lagged(missed)) => warn!(missed, "Missed rate update events"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut ticker = tokio::time::interval(interval);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if engine.update_exchange_rates().await.is_err() {
                    error!("Refresh task panicked");
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break;
            }
        }
    }
}
