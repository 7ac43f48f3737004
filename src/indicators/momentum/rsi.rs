//! RSI (Relative Strength Index) indicator
//!
//! Wilder-style smoothing: `avg = (prev * (p - 1) + x) / p`. When either the
//! smoothed gain or the smoothed loss is exactly zero the RSI is reported as
//! `0.0`.

use crate::indicators::error::IndicatorError;
use crate::models::indicators::RsiState;

pub const RSI_PERIOD: usize = 6;

/// Advance RSI by one close
pub fn next_rsi(
    previous: &RsiState,
    last_close: f64,
    close: f64,
    period: usize,
) -> Result<RsiState, IndicatorError> {
    if period == 0 {
        return Err(IndicatorError::InvalidWindow {
            window: period,
            len: 0,
        });
    }

    let n = period as f64;
    let past = n - 1.0;

    let delta = close - last_close;
    let (gain, loss) = if delta > 0.0 { (delta, 0.0) } else { (0.0, -delta) };

    let rs_gain = (previous.rs_gain * past + gain) / n;
    let rs_loss = (previous.rs_loss * past + loss) / n;

    let rsi = if rs_gain == 0.0 || rs_loss == 0.0 {
        0.0
    } else {
        let rs = rs_gain / rs_loss;
        (rs / (1.0 + rs)) * 100.0
    };

    Ok(RsiState {
        rsi,
        rs_gain,
        rs_loss,
    })
}

/// Calculate RSI for every close. The first bar is all zeros.
pub fn calculate_rsi_series(closes: &[f64], period: usize) -> Result<Vec<RsiState>, IndicatorError> {
    if period == 0 {
        return Err(IndicatorError::InvalidWindow {
            window: period,
            len: closes.len(),
        });
    }
    if closes.is_empty() {
        return Ok(Vec::new());
    }

    let mut out = Vec::with_capacity(closes.len());
    let mut state = RsiState::default();
    out.push(state);

    for pair in closes.windows(2) {
        state = next_rsi(&state, pair[0], pair[1], period)?;
        out.push(state);
    }

    Ok(out)
}
