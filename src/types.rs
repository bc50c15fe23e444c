// =============================================================================
// Shared types used across the signal engine
// =============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One OHLC record for a fixed period, as delivered by the market-data feed.
///
/// `timestamp` is the period's open time. Candles are immutable once they
/// leave the feed; the indicator engine only ever borrows them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Candle {
    pub fn new(timestamp: DateTime<Utc>, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
        }
    }

    /// True while the period that started at `timestamp` has not yet ended.
    pub fn is_forming(&self, period_seconds: u32, now: DateTime<Utc>) -> bool {
        self.timestamp + chrono::Duration::seconds(i64::from(period_seconds)) > now
    }
}

/// Price position relative to the long trend line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendState {
    Uptrend,
    Downtrend,
}

impl std::fmt::Display for TrendState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uptrend => write!(f, "UPTREND"),
            Self::Downtrend => write!(f, "DOWNTREND"),
        }
    }
}

/// Trading decision for the most recent completed candle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    EnterLong,
    EnterShort,
    None,
}

impl Decision {
    /// Order side implied by the decision; `None` never trades.
    pub fn side(self) -> Option<Side> {
        match self {
            Self::EnterLong => Some(Side::Buy),
            Self::EnterShort => Some(Side::Sell),
            Self::None => None,
        }
    }

    pub fn is_actionable(self) -> bool {
        self != Self::None
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EnterLong => write!(f, "ENTER_LONG"),
            Self::EnterShort => write!(f, "ENTER_SHORT"),
            Self::None => write!(f, "NONE"),
        }
    }
}

/// Order direction. Short-duration brokers call these CALL and PUT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }

    pub fn option_label(self) -> &'static str {
        match self {
            Self::Buy => "CALL",
            Self::Sell => "PUT",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the bot submits orders or only reports signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradingMode {
    Live,
    Paused,
}

impl Default for TradingMode {
    fn default() -> Self {
        Self::Paused
    }
}

impl std::fmt::Display for TradingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Live => write!(f, "Live"),
            Self::Paused => write!(f, "Paused"),
        }
    }
}

/// Whether we are running against real funds or simulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountMode {
    Demo,
    Live,
}

impl Default for AccountMode {
    fn default() -> Self {
        Self::Demo
    }
}

impl std::fmt::Display for AccountMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Demo => write!(f, "Demo"),
            Self::Live => write!(f, "Live"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn decision_maps_to_side() {
        assert_eq!(Decision::EnterLong.side(), Some(Side::Buy));
        assert_eq!(Decision::EnterShort.side(), Some(Side::Sell));
        assert_eq!(Decision::None.side(), None);
        assert!(!Decision::None.is_actionable());
    }

    #[test]
    fn decision_serialises_screaming_case() {
        let json = serde_json::to_string(&Decision::EnterShort).unwrap();
        assert_eq!(json, "\"ENTER_SHORT\"");
        assert_eq!(Decision::EnterLong.to_string(), "ENTER_LONG");
    }

    #[test]
    fn forming_candle_detection() {
        let open = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let candle = Candle::new(open, 1.0, 1.0, 1.0, 1.0);
        let mid_period = open + chrono::Duration::seconds(30);
        let period_end = open + chrono::Duration::seconds(60);
        assert!(candle.is_forming(60, mid_period));
        assert!(!candle.is_forming(60, period_end));
    }
}
