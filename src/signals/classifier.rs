// =============================================================================
// Signal Classifier — MACD crossover with zero-line filter
// =============================================================================
//
// Stateless: the decision depends only on the (prev, curr) pair passed in.
//
// Rules:
//   bullish crossover  prev.macd <= prev.signal  AND  curr.macd > curr.signal
//   bearish crossover  prev.macd >= prev.signal  AND  curr.macd < curr.signal
//   ENTER_LONG         bullish crossover AND curr.macd < 0
//   ENTER_SHORT        bearish crossover AND curr.macd > 0
//   NONE               everything else, including any unseeded field
//
// The trend state is reported alongside the decision but does not gate it.
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::indicator_engine::IndicatorPoint;
use crate::types::Decision;

/// The oscillator values of a single seeded point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OscillatorSnapshot {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

impl OscillatorSnapshot {
    /// `None` unless macd, signal and histogram are all defined.
    pub fn from_point(point: &IndicatorPoint) -> Option<Self> {
        Some(Self {
            macd: point.macd?,
            signal: point.signal?,
            histogram: point.histogram?,
        })
    }
}

/// MACD moved from at-or-below the signal line to strictly above it.
pub fn is_bullish_crossover(prev: &OscillatorSnapshot, curr: &OscillatorSnapshot) -> bool {
    prev.macd <= prev.signal && curr.macd > curr.signal
}

/// MACD moved from at-or-above the signal line to strictly below it.
pub fn is_bearish_crossover(prev: &OscillatorSnapshot, curr: &OscillatorSnapshot) -> bool {
    prev.macd >= prev.signal && curr.macd < curr.signal
}

/// Classify the most recent pair of completed indicator points.
///
/// Never fails: a pair with any unseeded field, or one that is not in
/// time order, is `Decision::None`.
pub fn classify(prev: &IndicatorPoint, curr: &IndicatorPoint) -> Decision {
    if !prev.is_seeded() || !curr.is_seeded() || curr.timestamp <= prev.timestamp {
        return Decision::None;
    }
    let (Some(prev_osc), Some(curr_osc)) = (OscillatorSnapshot::from_point(prev), OscillatorSnapshot::from_point(curr))
    else {
        return Decision::None;
    };

    if is_bullish_crossover(&prev_osc, &curr_osc) {
        if curr_osc.macd < 0.0 {
            Decision::EnterLong
        } else {
            Decision::None
        }
    } else if is_bearish_crossover(&prev_osc, &curr_osc) {
        if curr_osc.macd > 0.0 {
            Decision::EnterShort
        } else {
            Decision::None
        }
    } else {
        Decision::None
    }
}

/// The last two points of a series as an explicit `(prev, curr)` pair.
pub fn last_pair(points: &[IndicatorPoint]) -> Option<(&IndicatorPoint, &IndicatorPoint)> {
    match points {
        [.., prev, curr] => Some((prev, curr)),
        _ => None,
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicator_engine::{compute_indicators, IndicatorParams};
    use crate::types::Candle;
    use chrono::{DateTime, TimeZone, Utc};

    fn ts(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap() + chrono::Duration::minutes(minute)
    }

    fn point(minute: i64, macd: f64, signal: f64) -> IndicatorPoint {
        IndicatorPoint {
            timestamp: ts(minute),
            close: 1.1,
            trend_ma: Some(1.0),
            macd: Some(macd),
            signal: Some(signal),
            histogram: Some(macd - signal),
        }
    }

    #[test]
    fn bullish_crossover_below_zero_enters_long() {
        let prev = point(49, -0.004, -0.003);
        let curr = point(50, -0.002, -0.0025);
        assert_eq!(classify(&prev, &curr), Decision::EnterLong);
    }

    #[test]
    fn bullish_crossover_above_zero_is_filtered() {
        let prev = point(49, 0.001, 0.0015);
        let curr = point(50, 0.002, 0.0012);
        assert_eq!(classify(&prev, &curr), Decision::None);
    }

    #[test]
    fn bullish_crossover_at_zero_is_filtered() {
        let prev = point(49, -0.001, -0.0005);
        let curr = point(50, 0.0, -0.0001);
        assert_eq!(classify(&prev, &curr), Decision::None);
    }

    #[test]
    fn bearish_crossover_above_zero_enters_short() {
        let prev = point(49, 0.004, 0.003);
        let curr = point(50, 0.002, 0.0025);
        assert_eq!(classify(&prev, &curr), Decision::EnterShort);
    }

    #[test]
    fn bearish_crossover_below_zero_is_filtered() {
        let prev = point(49, -0.001, -0.0015);
        let curr = point(50, -0.002, -0.0012);
        assert_eq!(classify(&prev, &curr), Decision::None);
    }

    #[test]
    fn equality_on_prev_counts_as_not_yet_crossed() {
        let prev = point(49, -0.003, -0.003);
        let curr = point(50, -0.001, -0.002);
        assert_eq!(classify(&prev, &curr), Decision::EnterLong);

        let prev = point(49, 0.003, 0.003);
        let curr = point(50, 0.001, 0.002);
        assert_eq!(classify(&prev, &curr), Decision::EnterShort);
    }

    #[test]
    fn equality_on_curr_is_not_a_crossover() {
        let prev = point(49, -0.003, -0.002);
        let curr = point(50, -0.002, -0.002);
        assert_eq!(classify(&prev, &curr), Decision::None);
    }

    #[test]
    fn no_crossover_is_none() {
        let prev = point(49, -0.003, -0.002);
        let curr = point(50, -0.0025, -0.002);
        assert_eq!(classify(&prev, &curr), Decision::None);
    }

    #[test]
    fn trend_does_not_gate_the_decision() {
        let mut prev = point(49, -0.004, -0.003);
        let mut curr = point(50, -0.002, -0.0025);
        // close below the trend line: DOWNTREND, still a long entry
        prev.trend_ma = Some(2.0);
        curr.trend_ma = Some(2.0);
        assert_eq!(classify(&prev, &curr), Decision::EnterLong);
    }

    #[test]
    fn unseeded_fields_yield_none() {
        let curr = point(50, -0.002, -0.0025);

        let mut prev = point(49, -0.004, -0.003);
        prev.signal = None;
        assert_eq!(classify(&prev, &curr), Decision::None);

        let mut prev = point(49, -0.004, -0.003);
        prev.trend_ma = None;
        assert_eq!(classify(&prev, &curr), Decision::None);

        let prev = point(49, -0.004, -0.003);
        let mut curr = curr;
        curr.histogram = None;
        assert_eq!(classify(&prev, &curr), Decision::None);
    }

    #[test]
    fn out_of_order_pair_is_none() {
        let prev = point(50, -0.004, -0.003);
        let curr = point(49, -0.002, -0.0025);
        assert_eq!(classify(&prev, &curr), Decision::None);
    }

    #[test]
    fn classification_is_repeatable() {
        let prev = point(49, -0.004, -0.003);
        let curr = point(50, -0.002, -0.0025);
        let first = classify(&prev, &curr);
        let second = classify(&prev, &curr);
        assert_eq!(first, second);
    }

    #[test]
    fn last_pair_needs_two_points() {
        assert!(last_pair(&[]).is_none());
        assert!(last_pair(&[point(0, 0.0, 0.0)]).is_none());
        let points = vec![point(0, 0.0, 0.0), point(1, 1.0, 0.0), point(2, 2.0, 0.0)];
        let (prev, curr) = last_pair(&points).unwrap();
        assert_eq!(prev.timestamp, ts(1));
        assert_eq!(curr.timestamp, ts(2));
    }

    // ---- end-to-end over the indicator engine -----------------------------

    fn candles(closes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Candle::new(ts(i as i64), c, c, c, c))
            .collect()
    }

    /// Accelerating decline for 50 candles, then a sharp rebound at index 50.
    fn decline_then_rebound() -> Vec<f64> {
        let mut closes: Vec<f64> = (0..50).map(|i| 100.0 - 0.01 * (i * i) as f64).collect();
        closes.push(closes[49] + 20.0);
        closes
    }

    fn params() -> IndicatorParams {
        IndicatorParams {
            trend_period: 20,
            ..IndicatorParams::default()
        }
    }

    #[test]
    fn rebound_below_zero_line_enters_long_at_index_50() {
        let points = compute_indicators(&candles(&decline_then_rebound()), &params()).unwrap();
        assert!(points[50].macd.unwrap() < 0.0);
        assert_eq!(classify(&points[49], &points[50]), Decision::EnterLong);
    }

    #[test]
    fn drop_above_zero_line_enters_short_at_index_50() {
        let mirrored: Vec<f64> = decline_then_rebound().iter().map(|c| 200.0 - c).collect();
        let points = compute_indicators(&candles(&mirrored), &params()).unwrap();
        assert!(points[50].macd.unwrap() > 0.0);
        assert_eq!(classify(&points[49], &points[50]), Decision::EnterShort);
    }

    #[test]
    fn rebound_inside_uptrend_crosses_above_zero_line_and_is_none() {
        // steady climb, a two-candle pullback, then a jump at index 50
        let mut closes: Vec<f64> = (0..48).map(|i| 100.0 + 2.0 * i as f64).collect();
        closes.push(closes[47] - 2.0);
        closes.push(closes[48] - 2.0);
        closes.push(closes[49] + 20.0);

        let points = compute_indicators(&candles(&closes), &params()).unwrap();
        let prev = OscillatorSnapshot::from_point(&points[49]).unwrap();
        let curr = OscillatorSnapshot::from_point(&points[50]).unwrap();
        assert!(is_bullish_crossover(&prev, &curr));
        assert!(curr.macd > 0.0);
        assert_eq!(classify(&points[49], &points[50]), Decision::None);
    }

    #[test]
    fn flat_series_never_signals() {
        let points = compute_indicators(&candles(&[1.0; 300]), &IndicatorParams::default()).unwrap();
        for pair in points.windows(2) {
            assert_eq!(classify(&pair[0], &pair[1]), Decision::None);
        }
    }

    #[test]
    fn every_crossover_respects_zero_line() {
        let closes: Vec<f64> = (0..400)
            .map(|i| 1.0 + (i as f64 / 9.0).sin() * 0.01 + (i as f64 / 31.0).cos() * 0.02)
            .collect();
        let points = compute_indicators(&candles(&closes), &params()).unwrap();
        let mut crossovers = 0;
        for pair in points.windows(2) {
            let (Some(prev), Some(curr)) = (
                OscillatorSnapshot::from_point(&pair[0]),
                OscillatorSnapshot::from_point(&pair[1]),
            ) else {
                continue;
            };
            let decision = classify(&pair[0], &pair[1]);
            if is_bullish_crossover(&prev, &curr) {
                crossovers += 1;
                let expected = if curr.macd < 0.0 { Decision::EnterLong } else { Decision::None };
                assert_eq!(decision, expected);
            } else if is_bearish_crossover(&prev, &curr) {
                crossovers += 1;
                let expected = if curr.macd > 0.0 { Decision::EnterShort } else { Decision::None };
                assert_eq!(decision, expected);
            } else {
                assert_eq!(decision, Decision::None);
            }
        }
        assert!(crossovers > 0);
    }
}
