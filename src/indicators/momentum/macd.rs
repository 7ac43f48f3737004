//! MACD (Moving Average Convergence Divergence) indicator
//!
//! EMA12 / EMA26 with smoothing 2/(n+1), DEA is a 9-period EMA of DIFF and
//! the histogram is `2 * (DIFF - DEA)`. The first bar seeds every EMA with
//! its own close.

use crate::models::indicators::MacdState;

/// MACD state of the first bar of a series
pub fn seed_macd(close: f64) -> MacdState {
    let ema12 = (close * 11.0 + close * 2.0) / 13.0;
    let ema26 = (close * 25.0 + close * 2.0) / 27.0;
    let diff = ema12 - ema26;
    let dea = (diff * 8.0 + diff * 2.0) / 10.0;

    MacdState {
        ema12,
        ema26,
        diff,
        dea,
        hist: 2.0 * (diff - dea),
    }
}

/// Advance MACD by one close
pub fn next_macd(previous: &MacdState, close: f64) -> MacdState {
    let ema12 = (previous.ema12 * 11.0 + close * 2.0) / 13.0;
    let ema26 = (previous.ema26 * 25.0 + close * 2.0) / 27.0;
    let diff = ema12 - ema26;
    let dea = (previous.dea * 8.0 + diff * 2.0) / 10.0;

    MacdState {
        ema12,
        ema26,
        diff,
        dea,
        hist: 2.0 * (diff - dea),
    }
}

/// Calculate MACD for every close. An empty input yields an empty series.
pub fn calculate_macd_series(closes: &[f64]) -> Vec<MacdState> {
    let mut out = Vec::with_capacity(closes.len());
    let mut iter = closes.iter();

    if let Some(&first) = iter.next() {
        let mut state = seed_macd(first);
        out.push(state);
        for &close in iter {
            state = next_macd(&state, close);
            out.push(state);
        }
    }

    out
}
