// =============================================================================
// MACD Signal Bot — Main Entry Point
// =============================================================================
//
// `analyze` evaluates the latest completed candle once and prints the report.
// `run` backfills history, follows the live kline stream and evaluates every
// time a candle closes. The bot starts in Demo + Paused mode for safety;
// live trading needs an explicit `--live`. Overrides and forced modes live
// only for the process; the config file is written by `init-config` alone.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod broker;
mod error;
mod execution;
mod indicator_engine;
mod indicators;
mod market_data;
mod runtime_config;
mod signal_report;
mod signals;
mod strategy;
mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::broker::{interval_for_period, BinanceBroker, Broker};
use crate::execution::ExecutionEngine;
use crate::market_data::kline_stream::DEFAULT_STREAM_URL;
use crate::market_data::{run_kline_stream, CandleBuffer, CandleKey};
use crate::runtime_config::RuntimeConfig;
use crate::signals::SignalCooldown;
use crate::strategy::{completed_candles, StrategyEngine};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = "MACD crossover signals with an SMA trend filter.")]
struct Cli {
    /// Runtime config file (JSON). Missing files fall back to defaults.
    #[arg(long, global = true, default_value = "runtime_config.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluates the most recent completed candle and prints the signal report.
    Analyze {
        /// Symbol to analyse (overrides config and BOT_SYMBOL).
        #[arg(short, long)]
        symbol: Option<String>,

        /// Days of history to fetch (overrides lookback_days).
        #[arg(short, long)]
        days: Option<u32>,
    },
    /// Follows the live stream and acts on every closed candle.
    Run {
        #[arg(short, long)]
        symbol: Option<String>,

        /// Allow Live trading and a Live account. Without it the bot only
        /// reports signals on a demo account.
        #[arg(long)]
        live: bool,
    },
    /// Writes a config file with every setting at its default.
    InitConfig {
        /// Replace an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze { symbol, days } => {
            let mut config = load_config(&cli.config, symbol)?;
            if let Some(days) = days {
                config.lookback_days = days;
            }
            config.validate()?;
            handle_analyze(config).await
        }
        Commands::Run { symbol, live } => {
            let mut config = load_config(&cli.config, symbol)?;
            config.enforce_startup_safety(live);
            handle_run(config).await
        }
        Commands::InitConfig { force } => handle_init_config(&cli.config, force),
    }
}

fn handle_init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to replace it)", path.display());
    }
    RuntimeConfig::default().save(path)
}

/// File, then environment, then command line.
fn load_config(path: &Path, symbol: Option<String>) -> Result<RuntimeConfig> {
    let mut config = RuntimeConfig::load_or_default(path)?;
    config.apply_env_overrides();
    if let Some(symbol) = symbol {
        config.symbol = symbol.trim().to_uppercase();
    }
    config.validate()?;
    Ok(config)
}

fn lookback_start(config: &RuntimeConfig) -> chrono::DateTime<Utc> {
    Utc::now() - chrono::Duration::days(i64::from(config.lookback_days))
}

// --- "Analyze" Subcommand Logic ---

async fn handle_analyze(config: RuntimeConfig) -> Result<()> {
    let broker = BinanceBroker::from_env()?;
    let strategy = StrategyEngine::new(config.strategy_params, config.period_seconds);

    let candles = broker
        .fetch_candles(&config.symbol, lookback_start(&config), config.period_seconds)
        .await
        .with_context(|| format!("failed to fetch candles for {}", config.symbol))?;

    let report = match strategy.evaluate(&config.symbol, &candles, Utc::now()) {
        Ok(report) => report,
        Err(e) => {
            error!(symbol = %config.symbol, kind = e.kind(), error = %e, "evaluation failed");
            return Err(e.into());
        }
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

// --- "Run" Subcommand Logic ---

/// Replace the buffered history with freshly fetched completed candles.
async fn backfill(broker: &dyn Broker, buffer: &CandleBuffer, key: &CandleKey, config: &RuntimeConfig) -> Result<usize> {
    let candles = broker
        .fetch_candles(&config.symbol, lookback_start(config), config.period_seconds)
        .await?;
    let completed = completed_candles(&candles, config.period_seconds, Utc::now());
    let count = completed.len();
    buffer.seed(key.clone(), completed.iter().cloned());
    info!(key = %key, count, "history backfilled");
    Ok(count)
}

async fn handle_run(config: RuntimeConfig) -> Result<()> {
    info!(
        symbol = %config.symbol,
        period_seconds = config.period_seconds,
        trading_mode = %config.trading_mode,
        account_mode = %config.account_mode,
        "signal bot starting"
    );

    let interval = interval_for_period(config.period_seconds)?;
    let key = CandleKey::new(config.symbol.clone(), interval);

    let broker = Arc::new(BinanceBroker::from_env()?);
    let strategy = StrategyEngine::new(config.strategy_params, config.period_seconds);
    let execution = ExecutionEngine::new(broker.clone(), config.trade_amount, config.trade_duration_secs);
    let mut cooldown = SignalCooldown::from_candles(config.cooldown_candles, config.period_seconds);

    let lookback_candles = (u64::from(config.lookback_days) * 86_400 / u64::from(config.period_seconds)) as usize;
    let capacity = lookback_candles.max(strategy.params().min_candles());
    let buffer = Arc::new(CandleBuffer::new(capacity));

    backfill(broker.as_ref(), &buffer, &key, &config).await?;

    // ── Kline stream with reconnect ──────────────────────────────────────
    let (closed_tx, mut closed_rx) = mpsc::channel(64);
    {
        let broker = broker.clone();
        let buffer = buffer.clone();
        let key = key.clone();
        let config = config.clone();
        let stream_url = std::env::var("BINANCE_STREAM_URL").unwrap_or_else(|_| DEFAULT_STREAM_URL.to_string());
        tokio::spawn(async move {
            loop {
                if let Err(e) = run_kline_stream(&stream_url, &key.symbol, &key.interval, &buffer, &closed_tx).await {
                    error!(key = %key, error = %e, "kline stream error, reconnecting in 5s");
                }
                if closed_tx.is_closed() {
                    break;
                }
                tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;
                // Candles missed while disconnected are fetched again.
                if let Err(e) = backfill(broker.as_ref(), &buffer, &key, &config).await {
                    warn!(key = %key, error = %e, "backfill after reconnect failed");
                }
            }
        });
    }

    info!("Streaming. Press Ctrl+C to stop.");

    // ── Evaluation loop ──────────────────────────────────────────────────
    loop {
        tokio::select! {
            closed = closed_rx.recv() => {
                let Some(closed) = closed else {
                    warn!("kline stream task ended");
                    break;
                };
                let candles = buffer.get_closed(&closed.key, capacity);
                // The close event can arrive a few ms before the period ends.
                let closed_at = closed.open_time + chrono::Duration::seconds(i64::from(config.period_seconds));
                match strategy.evaluate(&config.symbol, &candles, closed_at.max(Utc::now())) {
                    Ok(mut report) => {
                        let filtered = cooldown.filter(report.decision, report.timestamp);
                        report.apply_filter("cooldown", filtered);
                        let result = execution
                            .execute(&report, config.trading_mode, config.account_mode)
                            .await;
                        info!(
                            id = %report.id,
                            decision = %report.decision,
                            raw_decision = %report.raw_decision,
                            suppressed = report.is_suppressed(),
                            result = %result,
                            "candle processed"
                        );
                    }
                    Err(e) => {
                        error!(symbol = %config.symbol, kind = e.kind(), error = %e, "evaluation skipped");
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                warn!("Shutdown signal received, stopping gracefully");
                break;
            }
        }
    }

    info!("signal bot shut down complete");
    Ok(())
}
