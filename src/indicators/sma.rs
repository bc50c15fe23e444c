// =============================================================================
// Simple Moving Average (SMA)
// =============================================================================
//
// SMA_i = mean(input[i - period + 1 ..= i]), undefined for i < period - 1.
// Each window is summed from scratch so the value never drifts from the
// plain arithmetic mean over long series.

use super::align;

/// Compute the SMA series. Output element `j` covers inputs `j ..= j + period - 1`.
///
/// Returns an empty `Vec` when `period == 0` or the input is shorter than
/// `period`.
pub fn calculate_sma(inputs: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || inputs.len() < period {
        return Vec::new();
    }

    inputs
        .windows(period)
        .map(|window| window.iter().sum::<f64>() / period as f64)
        .collect()
}

/// SMA aligned to the input: `None` before index `period - 1`.
pub fn sma_series(inputs: &[f64], period: usize) -> Vec<Option<f64>> {
    align(calculate_sma(inputs, period), period.saturating_sub(1), inputs.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_basic() {
        let sma = calculate_sma(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert_eq!(sma, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn sma_insufficient_data() {
        assert!(calculate_sma(&[1.0, 2.0], 3).is_empty());
        assert!(calculate_sma(&[1.0, 2.0], 0).is_empty());
    }

    #[test]
    fn sma_series_undefined_before_window_fills() {
        let series = sma_series(&[4.0, 6.0, 8.0, 10.0], 2);
        assert_eq!(series, vec![None, Some(5.0), Some(7.0), Some(9.0)]);
    }
}
