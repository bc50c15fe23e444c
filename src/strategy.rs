// =============================================================================
// Strategy Engine — candles to SignalReport
// =============================================================================
//
// Evaluates one symbol on every completed candle.
//
// Pipeline:
//   1. Drop any trailing candle whose period has not ended yet
//   2. Compute the trend line and MACD over the remaining candles
//   3. Take the last two points as an explicit (prev, curr) pair
//   4. Classify and wrap the result in a SignalReport
//
// A candle that is still forming has a provisional close, so a crossover
// computed on it could vanish a moment later. It never reaches the engine.
// =============================================================================

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::{IndicatorError, Result};
use crate::indicator_engine::{compute_indicators, IndicatorParams};
use crate::signal_report::SignalReport;
use crate::signals::last_pair;
use crate::types::Candle;

/// The prefix of `candles` whose periods had all ended by `now`.
pub fn completed_candles(candles: &[Candle], period_seconds: u32, now: DateTime<Utc>) -> &[Candle] {
    let end = candles
        .iter()
        .rposition(|c| !c.is_forming(period_seconds, now))
        .map_or(0, |i| i + 1);
    &candles[..end]
}

pub struct StrategyEngine {
    params: IndicatorParams,
    period_seconds: u32,
}

impl StrategyEngine {
    pub fn new(params: IndicatorParams, period_seconds: u32) -> Self {
        Self { params, period_seconds }
    }

    pub fn params(&self) -> &IndicatorParams {
        &self.params
    }

    /// Evaluate `symbol` over `candles` as of `now`.
    pub fn evaluate(&self, symbol: &str, candles: &[Candle], now: DateTime<Utc>) -> Result<SignalReport> {
        let completed = completed_candles(candles, self.period_seconds, now);
        if completed.len() < candles.len() {
            debug!(
                symbol,
                dropped = candles.len() - completed.len(),
                "ignoring candle still in progress"
            );
        }

        let points = compute_indicators(completed, &self.params)?;
        let (prev, curr) = last_pair(&points).ok_or(IndicatorError::InsufficientData {
            required: 2,
            supplied: points.len(),
        })?;

        let report = SignalReport::from_pair(symbol, prev, curr);

        info!(
            symbol,
            candle = %report.timestamp.to_rfc3339(),
            close = report.close,
            decision = %report.decision,
            trend = ?report.trend,
            macd = ?curr.macd,
            signal = ?curr.signal,
            "evaluation complete"
        );

        Ok(report)
    }
}
