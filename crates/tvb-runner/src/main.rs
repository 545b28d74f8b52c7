//! # tvb-runner
//!
//! Main entry point for the TradingView → Alpaca bridge.
//!
//! Loads the JSON settings, reads the Alpaca keys for the selected account
//! from the environment (or `.env`), logs an account summary, and serves the
//! alert webhook until Ctrl+C.
//!
//! # Usage
//!
//! ```bash
//! tvb-runner settings.json --log-level info --log-dir logs
//! ```

mod webhook;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tvb_core::config::BrokerCredentials;
use tvb_core::trading::AccountSnapshot;
use tvb_core::types::AccountKind;
use tvb_engine::{EngineSettings, TradeOrchestrator};
use tvb_td::Broker;
use tvb_td::alpaca::AlpacaTd;
use tvb_td::alpaca::config::AlpacaConfig;

/// TradingView alert → Alpaca order bridge.
#[derive(Parser)]
#[command(name = "tvb-runner", about = "TradingView alert to Alpaca order bridge")]
struct Cli {
    /// Settings file path (JSON).
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Optional log directory for file output.
    #[arg(long)]
    log_dir: Option<String>,

    /// Listen on this port instead of the configured one.
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Initialize logging
    let _log_guard = tvb_core::logging::init_logging(&cli.log_level, cli.log_dir.as_deref(), "tvb-runner");

    info!("tvb-runner starting: config={}, log_level={}", cli.config.display(), cli.log_level);

    // 2. Load settings and credentials
    if let Err(e) = dotenvy::dotenv() {
        info!(".env not loaded ({e}), using process environment");
    }
    let settings = tvb_core::config::load_config(&cli.config)?.resolve()?;
    let credentials = BrokerCredentials::from_env(settings.account)?;
    info!("settings loaded: account={}, options={:?}", settings.account, settings.options);

    // 3. Broker and account summary
    let broker = Arc::new(AlpacaTd::new(AlpacaConfig::from_credentials(&credentials)));
    let account = broker.get_account().await.context("failed to fetch account")?;
    log_account_summary(settings.account, &account);

    // 4. Engine
    let engine_settings = EngineSettings::from_options(&settings.options)?;
    if !engine_settings.enabled {
        warn!("trading disabled: alerts are evaluated but no orders are placed or canceled");
    }
    let engine = Arc::new(TradeOrchestrator::new(broker, engine_settings));

    // 5. Serve the webhook until Ctrl+C
    let port = cli.port.unwrap_or(settings.server.port);
    let addr = format!("{}:{port}", settings.server.host);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("webhook listening on http://{addr}/, press Ctrl+C to stop");

    axum::serve(listener, webhook::create_router(engine))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("webhook stopped, goodbye");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => warn!("failed to listen for Ctrl+C ({e}), shutting down"),
    }
}

fn log_account_summary(kind: AccountKind, account: &AccountSnapshot) {
    info!("***account: {kind}");
    info!("status: {}", account.status);
    info!("account blocked: {}", account.account_blocked);
    info!("trade suspended by user: {}", account.trade_suspended_by_user);
    info!("trading blocked: {}", account.trading_blocked);
    info!("transfers blocked: {}", account.transfers_blocked);
    info!("equity: {} {}", account.equity, account.currency);
    info!("cash: {} {}", account.cash, account.currency);
    info!("buying power: {}", account.buying_power);
    info!("daytrading buying power: {}", account.daytrading_buying_power);
    info!("shorting enabled: {}", account.shorting_enabled);
    info!("crypto status: {}", account.crypto_status.as_deref().unwrap_or("n/a"));
}
