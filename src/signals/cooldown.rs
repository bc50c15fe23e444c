// =============================================================================
// Signal Cooldown — caller-side re-fire suppression
// =============================================================================
//
// The classifier is stateless, so the same crossover can fire again on the
// next candle if the lines wobble around each other. The cooldown remembers
// when an actionable decision last went out and downgrades any further one
// inside the window to NONE.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::types::Decision;

#[derive(Debug, Clone)]
pub struct SignalCooldown {
    window: Duration,
    last_fired: Option<DateTime<Utc>>,
}

impl SignalCooldown {
    /// A zero window disables suppression entirely.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_fired: None,
        }
    }

    /// Window of `candles` whole periods of `period_seconds` each.
    pub fn from_candles(candles: u32, period_seconds: u32) -> Self {
        Self::new(Duration::seconds(i64::from(candles) * i64::from(period_seconds)))
    }

    /// Pass `decision` through unless an actionable decision fired less than
    /// one window before `at`.
    pub fn filter(&mut self, decision: Decision, at: DateTime<Utc>) -> Decision {
        if !decision.is_actionable() {
            return decision;
        }

        if let Some(last) = self.last_fired {
            if self.window > Duration::zero() && at - last < self.window {
                debug!(
                    decision = %decision,
                    last_fired = %last.to_rfc3339(),
                    "decision suppressed by cooldown"
                );
                return Decision::None;
            }
        }

        self.last_fired = Some(at);
        decision
    }
}

impl Default for SignalCooldown {
    fn default() -> Self {
        Self::new(Duration::zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minute)
    }

    #[test]
    fn disabled_cooldown_passes_everything() {
        let mut cooldown = SignalCooldown::default();
        assert_eq!(cooldown.filter(Decision::EnterLong, at(0)), Decision::EnterLong);
        assert_eq!(cooldown.filter(Decision::EnterLong, at(1)), Decision::EnterLong);
    }

    #[test]
    fn suppresses_inside_window() {
        let mut cooldown = SignalCooldown::from_candles(3, 60);
        assert_eq!(cooldown.filter(Decision::EnterLong, at(0)), Decision::EnterLong);
        assert_eq!(cooldown.filter(Decision::EnterShort, at(1)), Decision::None);
        assert_eq!(cooldown.filter(Decision::EnterLong, at(2)), Decision::None);
        assert_eq!(cooldown.filter(Decision::EnterLong, at(3)), Decision::EnterLong);
        assert_eq!(cooldown.filter(Decision::EnterShort, at(4)), Decision::None);
    }

    #[test]
    fn none_does_not_reset_the_window() {
        let mut cooldown = SignalCooldown::from_candles(2, 60);
        cooldown.filter(Decision::EnterShort, at(0));
        assert_eq!(cooldown.filter(Decision::None, at(1)), Decision::None);
        // window still counts from minute 0
        assert_eq!(cooldown.filter(Decision::EnterLong, at(2)), Decision::EnterLong);
    }
}
