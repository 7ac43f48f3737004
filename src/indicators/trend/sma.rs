//! SMA (Simple Moving Average) indicator
//!
//! The first `w` values are all the mean of the first `w` closes, after that
//! the average rolls forward by adding the entering close and dropping the
//! leaving one.

use crate::indicators::error::IndicatorError;

/// Calculate the SMA for every index of `closes`.
pub fn calculate_sma_series(closes: &[f64], window: usize) -> Result<Vec<f64>, IndicatorError> {
    if window == 0 || window > closes.len() {
        return Err(IndicatorError::InvalidWindow {
            window,
            len: closes.len(),
        });
    }

    let seed = closes[..window].iter().sum::<f64>() / window as f64;
    let mut out = Vec::with_capacity(closes.len());
    out.resize(window, seed);

    let mut prev = seed;
    for i in window..closes.len() {
        prev = roll(prev, closes[i], closes[i - window], window);
        out.push(prev);
    }

    Ok(out)
}

/// Advance an SMA by one bar.
///
/// `closes` must end with the new close and hold at least `window + 1`
/// values so the leaving close is available.
pub fn next_sma(previous: f64, closes: &[f64], window: usize) -> Result<f64, IndicatorError> {
    if window == 0 {
        return Err(IndicatorError::InvalidWindow {
            window,
            len: closes.len(),
        });
    }
    if closes.len() < window + 1 {
        return Err(IndicatorError::InsufficientData {
            required: window + 1,
            available: closes.len(),
        });
    }

    let last = closes.len() - 1;
    Ok(roll(previous, closes[last], closes[last - window], window))
}

#[inline]
fn roll(previous: f64, entering: f64, leaving: f64, window: usize) -> f64 {
    previous + (entering - leaving) / window as f64
}
