// =============================================================================
// Indicator Engine — candles in, enriched indicator points out
// =============================================================================
//
// Derives the long trend line (SMA of close) and the MACD oscillator for every
// candle of an ordered series. The output has the same length and ordering as
// the input; each derived field is `None` until its indicator has seeded.
//
// Input is validated eagerly (finite prices, strictly increasing timestamps).
// Gaps between candles are NOT detected or filled: values after a gap remain
// numerically defined but no longer reflect a uniform period spacing.
// =============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{IndicatorError, Result};
use crate::indicators::{calculate_macd, sma_series};
use crate::types::{Candle, TrendState};

fn default_trend_period() -> usize {
    200
}

fn default_macd_fast() -> usize {
    12
}

fn default_macd_slow() -> usize {
    26
}

fn default_macd_signal() -> usize {
    9
}

/// Window and span settings for the trend line and the oscillator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorParams {
    /// SMA window of the trend line.
    #[serde(default = "default_trend_period")]
    pub trend_period: usize,

    /// Span of the fast price EMA.
    #[serde(default = "default_macd_fast")]
    pub macd_fast: usize,

    /// Span of the slow price EMA.
    #[serde(default = "default_macd_slow")]
    pub macd_slow: usize,

    /// Span of the EMA applied to the MACD line.
    #[serde(default = "default_macd_signal")]
    pub macd_signal: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            trend_period: default_trend_period(),
            macd_fast: default_macd_fast(),
            macd_slow: default_macd_slow(),
            macd_signal: default_macd_signal(),
        }
    }
}

impl IndicatorParams {
    /// Fewest candles `compute_indicators` accepts.
    pub fn min_candles(&self) -> usize {
        self.trend_period.max(self.macd_slow + self.macd_signal)
    }

    pub fn validate(&self) -> Result<()> {
        if self.trend_period == 0 || self.macd_fast == 0 || self.macd_slow == 0 || self.macd_signal == 0 {
            return Err(IndicatorError::InvalidParams(format!(
                "all periods must be positive (trend={}, fast={}, slow={}, signal={})",
                self.trend_period, self.macd_fast, self.macd_slow, self.macd_signal
            )));
        }
        if self.macd_fast >= self.macd_slow {
            return Err(IndicatorError::InvalidParams(format!(
                "macd_fast ({}) must be less than macd_slow ({})",
                self.macd_fast, self.macd_slow
            )));
        }
        Ok(())
    }
}

/// One candle enriched with its indicator values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorPoint {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
    pub trend_ma: Option<f64>,
    pub macd: Option<f64>,
    pub signal: Option<f64>,
    pub histogram: Option<f64>,
}

impl IndicatorPoint {
    /// UPTREND when close is strictly above the trend line, DOWNTREND
    /// otherwise; `None` while the trend line is still warming up.
    pub fn trend_state(&self) -> Option<TrendState> {
        let trend_ma = self.trend_ma?;
        if self.close > trend_ma {
            Some(TrendState::Uptrend)
        } else {
            Some(TrendState::Downtrend)
        }
    }

    /// True once the trend line and every oscillator field are defined.
    pub fn is_seeded(&self) -> bool {
        self.trend_ma.is_some() && self.macd.is_some() && self.signal.is_some() && self.histogram.is_some()
    }
}

/// Compute the trend line and MACD for every candle.
///
/// # Errors
/// - `InvalidParams` when the windows are zero or `macd_fast >= macd_slow`.
/// - `InsufficientData` when fewer than [`IndicatorParams::min_candles`]
///   candles are supplied.
/// - `MalformedCandle` on a non-finite price or a timestamp that does not
///   strictly increase.
pub fn compute_indicators(candles: &[Candle], params: &IndicatorParams) -> Result<Vec<IndicatorPoint>> {
    params.validate()?;

    let required = params.min_candles();
    if candles.len() < required {
        return Err(IndicatorError::InsufficientData {
            required,
            supplied: candles.len(),
        });
    }

    validate_candles(candles)?;

    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let trend = sma_series(&closes, params.trend_period);
    let macd = calculate_macd(&closes, params.macd_fast, params.macd_slow, params.macd_signal);

    let points = candles
        .iter()
        .enumerate()
        .map(|(i, candle)| IndicatorPoint {
            timestamp: candle.timestamp,
            close: candle.close,
            trend_ma: trend[i],
            macd: macd.macd[i],
            signal: macd.signal[i],
            histogram: macd.histogram[i],
        })
        .collect();

    Ok(points)
}

fn validate_candles(candles: &[Candle]) -> Result<()> {
    let mut prev_ts: Option<DateTime<Utc>> = None;

    for (index, candle) in candles.iter().enumerate() {
        let prices = [
            ("open", candle.open),
            ("high", candle.high),
            ("low", candle.low),
            ("close", candle.close),
        ];
        if let Some((field, value)) = prices.iter().find(|(_, v)| !v.is_finite()) {
            return Err(IndicatorError::MalformedCandle {
                index,
                reason: format!("{field} is not finite ({value})"),
            });
        }

        if let Some(prev) = prev_ts {
            if candle.timestamp <= prev {
                return Err(IndicatorError::MalformedCandle {
                    index,
                    reason: format!(
                        "timestamp {} does not follow previous {}",
                        candle.timestamp.to_rfc3339(),
                        prev.to_rfc3339()
                    ),
                });
            }
        }
        prev_ts = Some(candle.timestamp);
    }

    Ok(())
}
