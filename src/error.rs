// =============================================================================
// Indicator engine errors
// =============================================================================
//
// Only input-shape problems are errors. Indicators that are still warming up
// are represented as `None` fields on `IndicatorPoint`, never as an error.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndicatorError {
    #[error("insufficient data: {supplied} candles supplied, at least {required} required")]
    InsufficientData { required: usize, supplied: usize },

    #[error("malformed candle at index {index}: {reason}")]
    MalformedCandle { index: usize, reason: String },

    #[error("invalid indicator parameters: {0}")]
    InvalidParams(String),
}

impl IndicatorError {
    /// Stable label for the `kind` field of log events.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InsufficientData { .. } => "insufficient_data",
            Self::MalformedCandle { .. } => "malformed_candle",
            Self::InvalidParams(_) => "invalid_params",
        }
    }
}

pub type Result<T> = std::result::Result<T, IndicatorError>;
