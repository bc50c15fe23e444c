// =============================================================================
// Broker — market data and order submission seam
// =============================================================================
//
// The signal engine never talks to an exchange directly. Candles come in and
// orders go out through the `Broker` trait so that the live client can be
// swapped for an in-memory stub in tests.
// =============================================================================

pub mod binance;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::signal_report::SignalReport;
use crate::types::{Candle, Side};

pub use binance::BinanceBroker;

/// An order derived from an actionable decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Client-side order id (UUID v4).
    pub id: String,
    pub symbol: String,
    pub side: Side,
    /// Quote-currency amount.
    pub amount: f64,
    pub duration_secs: u32,
    /// Open time of the candle whose close produced the decision.
    pub decided_at: DateTime<Utc>,
}

impl OrderRequest {
    /// `None` when the report's decision is not actionable.
    pub fn from_report(report: &SignalReport, amount: f64, duration_secs: u32) -> Option<Self> {
        let side = report.decision.side()?;
        Some(Self {
            id: uuid::Uuid::new_v4().to_string(),
            symbol: report.symbol.clone(),
            side,
            amount,
            duration_secs,
            decided_at: report.timestamp,
        })
    }
}

/// What the broker reported back after accepting an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAck {
    pub order_id: String,
    pub status: String,
    #[serde(default)]
    pub raw: serde_json::Value,
}

#[async_trait]
pub trait Broker: Send + Sync {
    /// Completed and in-progress candles from `from` up to now, oldest first.
    async fn fetch_candles(&self, symbol: &str, from: DateTime<Utc>, period_seconds: u32) -> Result<Vec<Candle>>;

    async fn submit_order(&self, order: &OrderRequest) -> Result<OrderAck>;
}

/// Exchange interval label for a candle period.
pub fn interval_for_period(period_seconds: u32) -> Result<&'static str> {
    let interval = match period_seconds {
        60 => "1m",
        180 => "3m",
        300 => "5m",
        900 => "15m",
        1_800 => "30m",
        3_600 => "1h",
        7_200 => "2h",
        14_400 => "4h",
        21_600 => "6h",
        28_800 => "8h",
        43_200 => "12h",
        86_400 => "1d",
        259_200 => "3d",
        604_800 => "1w",
        other => bail!("unsupported candle period: {other}s"),
    };
    Ok(interval)
}
