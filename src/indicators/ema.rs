// =============================================================================
// Exponential Moving Average (EMA)
// =============================================================================
//
// EMA gives more weight to recent prices, making it more responsive to new
// information than the Simple Moving Average (SMA).
//
// Formula:
//   multiplier = 2 / (span + 1)
//   EMA_t      = input_t * multiplier + EMA_{t-1} * (1 - multiplier)
//
// The very first EMA value is seeded with the SMA of the first `span` inputs.
// The update is evaluated as `EMA_{t-1} + multiplier * (input_t - EMA_{t-1})`,
// which is the same law and keeps a constant input exactly constant.
// =============================================================================

/// Smoothing factor for a given span.
pub fn smoothing_factor(span: usize) -> f64 {
    2.0 / (span as f64 + 1.0)
}

/// Compute the EMA series for the given `inputs` slice and `span`.
///
/// Returns an empty `Vec` when the input is too short or the span is zero.
/// Each output element corresponds to an input starting at index `span - 1`.
///
/// # Edge cases
/// - `span == 0` => empty vec (division by zero guard)
/// - `inputs.len() < span` => empty vec
/// - A non-finite value stops the series; downstream consumers should not
///   trust anything computed past it.
pub fn calculate_ema(inputs: &[f64], span: usize) -> Vec<f64> {
    if span == 0 || inputs.len() < span {
        return Vec::new();
    }

    let multiplier = smoothing_factor(span);

    // Seed: SMA of the first `span` values.
    let seed: f64 = inputs[..span].iter().sum::<f64>() / span as f64;
    if !seed.is_finite() {
        return Vec::new();
    }

    let mut result = Vec::with_capacity(inputs.len() - span + 1);
    result.push(seed);

    let mut prev_ema = seed;
    for &value in &inputs[span..] {
        let ema = prev_ema + multiplier * (value - prev_ema);
        if !ema.is_finite() {
            break;
        }
        result.push(ema);
        prev_ema = ema;
    }

    result
}
