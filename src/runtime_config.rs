// =============================================================================
// Runtime Configuration — signal bot settings with atomic save
// =============================================================================
//
// Every tunable parameter of the bot lives here: which market to watch, how
// far back to backfill, what an order looks like, and the indicator periods.
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash.  All fields carry `#[serde(default)]` so that adding new fields
// never breaks loading an older config file.
//
// =============================================================================

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::indicator_engine::IndicatorParams;
use crate::types::{AccountMode, TradingMode};

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_symbol() -> String {
    "EURUSDT".to_string()
}

fn default_period_seconds() -> u32 {
    60
}

fn default_lookback_days() -> u32 {
    30
}

fn default_trade_amount() -> f64 {
    50.0
}

fn default_trade_duration_secs() -> u32 {
    60
}

// =============================================================================
// RuntimeConfig
// =============================================================================

/// Top-level runtime configuration for the signal bot.
///
/// Every field has a serde default so that older JSON files missing new fields
/// will still deserialise correctly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    // --- Operational modes ---------------------------------------------------

    /// Paused reports signals only. Live hands them to the execution engine.
    #[serde(default)]
    pub trading_mode: TradingMode,

    /// Whether running against real funds or simulated: Demo or Live.
    #[serde(default)]
    pub account_mode: AccountMode,

    // --- Market --------------------------------------------------------------

    #[serde(default = "default_symbol")]
    pub symbol: String,

    /// Candle period in seconds.
    #[serde(default = "default_period_seconds")]
    pub period_seconds: u32,

    /// How many days of history to backfill before evaluating.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,

    // --- Orders --------------------------------------------------------------

    /// Quote-currency amount per order.
    #[serde(default = "default_trade_amount")]
    pub trade_amount: f64,

    /// Expiry attached to each order request.
    #[serde(default = "default_trade_duration_secs")]
    pub trade_duration_secs: u32,

    /// Candles to wait after an actionable decision before the next one may
    /// fire. 0 disables the cooldown.
    #[serde(default)]
    pub cooldown_candles: u32,

    // --- Strategy parameters ------------------------------------------------

    /// Trend line and MACD periods.
    #[serde(default)]
    pub strategy_params: IndicatorParams,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            trading_mode: TradingMode::Paused,
            account_mode: AccountMode::Demo,
            symbol: default_symbol(),
            period_seconds: default_period_seconds(),
            lookback_days: default_lookback_days(),
            trade_amount: default_trade_amount(),
            trade_duration_secs: default_trade_duration_secs(),
            cooldown_candles: 0,
            strategy_params: IndicatorParams::default(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        info!(
            path = %path.display(),
            symbol = %config.symbol,
            trading_mode = %config.trading_mode,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Load from `path`, falling back to defaults only when the file does
    /// not exist. A file that exists but cannot be read or parsed is an
    /// error, so a typo never silently replaces the user's settings.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(path = %path.display(), "runtime config not found, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise runtime config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "runtime config saved (atomic)");
        Ok(())
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.strategy_params
            .validate()
            .context("invalid strategy_params")?;

        if self.symbol.trim().is_empty() {
            bail!("symbol must not be empty");
        }
        if self.period_seconds == 0 {
            bail!("period_seconds must be > 0");
        }
        if self.lookback_days == 0 {
            bail!("lookback_days must be > 0");
        }
        if !(self.trade_amount.is_finite() && self.trade_amount > 0.0) {
            bail!("trade_amount must be > 0, got {}", self.trade_amount);
        }
        if self.trade_duration_secs == 0 {
            bail!("trade_duration_secs must be > 0");
        }
        Ok(())
    }

    /// Apply `BOT_SYMBOL` from the environment, if set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(symbol) = std::env::var("BOT_SYMBOL") {
            let symbol = symbol.trim().to_uppercase();
            if !symbol.is_empty() {
                info!(symbol = %symbol, "symbol overridden from BOT_SYMBOL");
                self.symbol = symbol;
            }
        }
    }

    /// Force signal-only demo operation unless the operator opted into live
    /// trading on the command line.
    pub fn enforce_startup_safety(&mut self, live_requested: bool) {
        if live_requested {
            warn!("live trading requested on the command line");
            self.trading_mode = TradingMode::Live;
            self.account_mode = AccountMode::Live;
            return;
        }
        if self.trading_mode != TradingMode::Paused || self.account_mode != AccountMode::Demo {
            warn!(
                trading_mode = %self.trading_mode,
                account_mode = %self.account_mode,
                "config asks for live operation; starting Paused + Demo (use --live)"
            );
        }
        self.trading_mode = TradingMode::Paused;
        self.account_mode = AccountMode::Demo;
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = RuntimeConfig::default();
        assert_eq!(cfg.trading_mode, TradingMode::Paused);
        assert_eq!(cfg.account_mode, AccountMode::Demo);
        assert_eq!(cfg.symbol, "EURUSDT");
        assert_eq!(cfg.period_seconds, 60);
        assert_eq!(cfg.lookback_days, 30);
        assert!((cfg.trade_amount - 50.0).abs() < f64::EPSILON);
        assert_eq!(cfg.cooldown_candles, 0);
        assert_eq!(cfg.strategy_params.trend_period, 200);
        assert_eq!(cfg.strategy_params.macd_fast, 12);
        assert_eq!(cfg.strategy_params.macd_slow, 26);
        assert_eq!(cfg.strategy_params.macd_signal, 9);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: RuntimeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.trading_mode, TradingMode::Paused);
        assert_eq!(cfg.account_mode, AccountMode::Demo);
        assert_eq!(cfg.symbol, "EURUSDT");
        assert_eq!(cfg.strategy_params.min_candles(), 200);
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{ "trading_mode": "Live", "symbol": "BTCUSDT", "strategy_params": { "trend_period": 50 } }"#;
        let cfg: RuntimeConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.trading_mode, TradingMode::Live);
        assert_eq!(cfg.symbol, "BTCUSDT");
        assert_eq!(cfg.strategy_params.trend_period, 50);
        assert_eq!(cfg.strategy_params.macd_slow, 26);
        assert_eq!(cfg.period_seconds, 60);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut cfg = RuntimeConfig::default();
        cfg.strategy_params.macd_fast = 30;
        assert!(cfg.validate().is_err());

        let mut cfg = RuntimeConfig::default();
        cfg.trade_amount = 0.0;
        assert!(cfg.validate().is_err());

        let mut cfg = RuntimeConfig::default();
        cfg.period_seconds = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = RuntimeConfig::default();
        cfg.symbol = "  ".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn startup_safety_forces_paused_demo() {
        let mut cfg = RuntimeConfig::default();
        cfg.trading_mode = TradingMode::Live;
        cfg.account_mode = AccountMode::Live;
        cfg.enforce_startup_safety(false);
        assert_eq!(cfg.trading_mode, TradingMode::Paused);
        assert_eq!(cfg.account_mode, AccountMode::Demo);

        cfg.enforce_startup_safety(true);
        assert_eq!(cfg.trading_mode, TradingMode::Live);
        assert_eq!(cfg.account_mode, AccountMode::Live);
    }

    #[test]
    fn save_then_load_preserves_settings() {
        let path = std::env::temp_dir().join(format!("macd-signal-bot-{}.json", uuid::Uuid::new_v4()));
        let mut cfg = RuntimeConfig::default();
        cfg.symbol = "ETHUSDT".into();
        cfg.cooldown_candles = 3;
        cfg.save(&path).unwrap();

        let loaded = RuntimeConfig::load(&path).unwrap();
        assert_eq!(loaded.symbol, "ETHUSDT");
        assert_eq!(loaded.cooldown_candles, 3);
        assert!(!path.with_extension("json.tmp").exists());
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = RuntimeConfig::load_or_default("/nonexistent/macd-signal-bot.json").unwrap();
        assert_eq!(cfg.symbol, "EURUSDT");
    }

    #[test]
    fn malformed_file_is_an_error_and_left_untouched() {
        let path = std::env::temp_dir().join(format!("macd-signal-bot-{}.json", uuid::Uuid::new_v4()));
        let user_config = r#"{ "symbol": "BTCUSDT", "trade_amount": 25.0, "cooldown_candles": 3, }"#;
        std::fs::write(&path, user_config).unwrap();

        assert!(RuntimeConfig::load_or_default(&path).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), user_config);
        std::fs::remove_file(&path).unwrap();
    }
}
