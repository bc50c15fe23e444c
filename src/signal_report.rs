// =============================================================================
// Signal Report — auditable record of every evaluation
// =============================================================================
//
// Produced after each completed candle and handed to the execution layer and
// the logs. It carries the decision together with the trend state and the
// oscillator values of both points the classifier looked at, so a decision
// can be reconstructed after the fact.
// =============================================================================

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::indicator_engine::IndicatorPoint;
use crate::signals::{classify, OscillatorSnapshot};
use crate::types::{Decision, TrendState};

#[derive(Debug, Clone, Serialize)]
pub struct SignalReport {
    /// Unique identifier for this evaluation (UUID v4).
    pub id: String,

    pub symbol: String,

    /// Open time of the candle the decision belongs to.
    pub timestamp: DateTime<Utc>,

    pub close: f64,

    /// Final decision after any caller-side filtering.
    pub decision: Decision,

    /// What the classifier returned, before filtering.
    pub raw_decision: Decision,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend: Option<TrendState>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend_ma: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<OscillatorSnapshot>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub curr: Option<OscillatorSnapshot>,

    /// Which filter downgraded the decision, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suppressed_by: Option<String>,

    /// ISO 8601 timestamp of when this report was created.
    pub created_at: String,
}

impl SignalReport {
    /// Classify `(prev, curr)` and capture everything needed to audit it.
    pub fn from_pair(symbol: impl Into<String>, prev: &IndicatorPoint, curr: &IndicatorPoint) -> Self {
        let decision = classify(prev, curr);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            symbol: symbol.into(),
            timestamp: curr.timestamp,
            close: curr.close,
            decision,
            raw_decision: decision,
            trend: curr.trend_state(),
            trend_ma: curr.trend_ma,
            prev: OscillatorSnapshot::from_point(prev),
            curr: OscillatorSnapshot::from_point(curr),
            suppressed_by: None,
            created_at: Utc::now().to_rfc3339(),
        }
    }

    /// Replace the decision with `filtered`, recording `filter` when it
    /// changed anything.
    pub fn apply_filter(&mut self, filter: impl Into<String>, filtered: Decision) {
        if filtered != self.decision {
            self.suppressed_by = Some(filter.into());
            self.decision = filtered;
        }
    }

    pub fn is_suppressed(&self) -> bool {
        self.suppressed_by.is_some()
    }
}
