// =============================================================================
// MACD (Moving Average Convergence Divergence)
// =============================================================================
//
//   macd      = EMA(fast) - EMA(slow)          defined from index slow - 1
//   signal    = EMA(signal_span) of macd       defined from index slow + signal_span - 2
//   histogram = macd - signal
//
// Both price EMAs are seeded independently on the price series; the signal
// EMA is seeded on the first `signal_span` defined macd values.
// =============================================================================

use super::align;
use super::ema::calculate_ema;

/// MACD lines aligned to the input series.
#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    pub macd: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
    pub histogram: Vec<Option<f64>>,
}

impl MacdSeries {
    fn undefined(len: usize) -> Self {
        Self {
            macd: vec![None; len],
            signal: vec![None; len],
            histogram: vec![None; len],
        }
    }
}

/// Calculate the full MACD series for `closes`.
///
/// Requires `0 < fast < slow` and `signal_span > 0`; otherwise every value is
/// `None`. Too-short input also yields an all-`None` series rather than an
/// error, the caller decides whether that is acceptable.
pub fn calculate_macd(closes: &[f64], fast: usize, slow: usize, signal_span: usize) -> MacdSeries {
    let len = closes.len();
    if fast == 0 || signal_span == 0 || fast >= slow || len < slow {
        return MacdSeries::undefined(len);
    }

    let fast_ema = calculate_ema(closes, fast);
    let slow_ema = calculate_ema(closes, slow);

    // fast_ema[0] sits at index fast - 1, slow_ema[0] at slow - 1.
    let shift = slow - fast;
    let macd_compact: Vec<f64> = slow_ema
        .iter()
        .zip(fast_ema.iter().skip(shift))
        .map(|(slow_val, fast_val)| fast_val - slow_val)
        .collect();

    let signal_compact = calculate_ema(&macd_compact, signal_span);
    let histogram_compact: Vec<f64> = signal_compact
        .iter()
        .zip(macd_compact.iter().skip(signal_span - 1))
        .map(|(signal_val, macd_val)| macd_val - signal_val)
        .collect();

    let macd_start = slow - 1;
    let signal_start = macd_start + signal_span - 1;

    MacdSeries {
        macd: align(macd_compact, macd_start, len),
        signal: align(signal_compact, signal_start, len),
        histogram: align(histogram_compact, signal_start, len),
    }
}
