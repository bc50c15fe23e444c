// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free rolling computations over a price series. The
// `calculate_*` functions return compact series that start at the seed index;
// `sma_series` and the MACD lines pad them with `None` so index `i` of the
// output lines up with index `i` of the input.

pub mod ema;
pub mod macd;
pub mod sma;

pub use macd::calculate_macd;
pub use sma::sma_series;

/// Place `values` at `offset` inside a series of length `len`, `None` elsewhere.
pub(crate) fn align(values: Vec<f64>, offset: usize, len: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; len];
    for (slot, value) in out.iter_mut().skip(offset).zip(values) {
        *slot = Some(value);
    }
    out
}
