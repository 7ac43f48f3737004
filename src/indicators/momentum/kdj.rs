//! KDJ (stochastic oscillator with J line) indicator
//!
//! RSV compares the close to the trailing high/low range of up to
//! [`KDJ_PERIOD`] bars. A flat range reports RSV 50.

use crate::indicators::error::IndicatorError;
use crate::models::candle::Candle;
use crate::models::indicators::KdjState;

pub const KDJ_PERIOD: usize = 9;

/// RSV of the last candle of `window`.
fn raw_stochastic(window: &[Candle]) -> Option<f64> {
    let last = window.last()?;
    let high = window.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
    let low = window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);

    if high == low {
        return Some(50.0);
    }
    Some(((last.close - low) / (high - low)) * 100.0)
}

/// Trailing window of at most `KDJ_PERIOD` candles ending at `candles.len() - 1`.
fn trailing(candles: &[Candle]) -> &[Candle] {
    let start = candles.len().saturating_sub(KDJ_PERIOD);
    &candles[start..]
}

fn step(previous: &KdjState, rsv: f64) -> KdjState {
    let k = (2.0 * previous.k + rsv) / 3.0;
    let d = (2.0 * previous.d + k) / 3.0;

    KdjState {
        rsv,
        k,
        d,
        j: 3.0 * k - 2.0 * d,
    }
}

/// Advance KDJ by one bar.
///
/// `candles` must end with the new bar; only its trailing `KDJ_PERIOD`
/// candles are read.
pub fn next_kdj(previous: &KdjState, candles: &[Candle]) -> Result<KdjState, IndicatorError> {
    let rsv = raw_stochastic(trailing(candles)).ok_or(IndicatorError::InsufficientData {
        required: 1,
        available: 0,
    })?;

    Ok(step(previous, rsv))
}

/// Calculate KDJ for every candle. K, D and J start at 50.
pub fn calculate_kdj_series(candles: &[Candle]) -> Vec<KdjState> {
    let mut out: Vec<KdjState> = Vec::with_capacity(candles.len());

    for i in 0..candles.len() {
        let rsv = raw_stochastic(trailing(&candles[..=i])).unwrap_or(50.0);
        let state = match out.last() {
            Some(previous) => step(previous, rsv),
            None => KdjState {
                rsv,
                k: 50.0,
                d: 50.0,
                j: 50.0,
            },
        };
        out.push(state);
    }

    out
}

/// KDJ J of the last candle, `None` for an empty history
pub fn latest_kdj_j(candles: &[Candle]) -> Option<f64> {
    calculate_kdj_series(candles).last().map(|s| s.j)
}
