mod cli;

use std::io::{self, Stdout};
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use eth_gas_window::api::{self, AppState};
use eth_gas_window::chart::{ChartHandle, TextChart};
use eth_gas_window::client::{GasTracker, ProxyClient, RefreshOutcome};
use eth_gas_window::config::Config;
use eth_gas_window::etherscan::EtherscanClient;
use eth_gas_window::storage;
use eth_gas_window::window::HORIZON_MINUTES;

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env().context("failed to load configuration")?;

    match cli.command {
        Commands::Serve { addr } => {
            let api_key = config.require_api_key()?;
            let upstream = EtherscanClient::new(
                &config.etherscan_api_url,
                api_key,
                config.upstream_timeout,
            )?;
            let bind = addr.unwrap_or_else(|| config.http_bind_addr.clone());
            api::run_http_server(&bind, AppState::new(upstream)).await?;
        }
        Commands::Refresh { server } => {
            let proxy = ProxyClient::new(server.as_deref().unwrap_or(config.gas_server_url.as_str()))?;
            let mut tracker = open_tracker(&config).await?;
            report(tracker.refresh(&proxy, Utc::now()).await?);
        }
        Commands::Show => {
            // open() already drew a restored window
            let mut tracker = open_tracker(&config).await?;
            if tracker.window().is_empty() {
                tracker.redraw()?;
            }
        }
        Commands::Monitor { server } => {
            let proxy = ProxyClient::new(server.as_deref().unwrap_or(config.gas_server_url.as_str()))?;
            let tracker = open_tracker(&config).await?;
            monitor(tracker, proxy).await?;
        }
    }

    Ok(())
}

async fn open_tracker(config: &Config) -> anyhow::Result<GasTracker<TextChart<Stdout>>> {
    let pool = storage::init_pool(&config.database_url).await?;
    let chart = ChartHandle::initialize(None, TextChart::new(io::stdout()));
    GasTracker::open(pool, chart, Utc::now()).await
}

async fn monitor(mut tracker: GasTracker<TextChart<Stdout>>, proxy: ProxyClient) -> anyhow::Result<()> {
    let period = Duration::from_secs(HORIZON_MINUTES as u64 * 60);
    let mut expiry = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    tracing::info!("press Enter to refresh gas fees, q to quit");
    let mut stdin_open = true;
    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(err) => {
                        tracing::error!("failed reading stdin, refresh disabled until restart: {}", err);
                        stdin_open = false;
                        continue;
                    }
                };
                if line.trim() == "q" {
                    break;
                }
                match tracker.refresh(&proxy, Utc::now()).await {
                    Ok(outcome) => report(outcome),
                    Err(err) => tracing::error!("error fetching gas fees: {:#}", err),
                }
            }
            _ = expiry.tick() => {
                tracker.expiry_tick(Utc::now()).await;
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}

fn report(outcome: RefreshOutcome) {
    match outcome {
        RefreshOutcome::Appended { len } => tracing::info!("stored sample, window holds {}", len),
        RefreshOutcome::Unchanged => tracing::info!("gas fees moved less than 1 GWEI, not stored"),
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();
}
