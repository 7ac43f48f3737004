//! Indicator snapshot engine.
//!
//! Turns a candle history into one [`IndicatorSnapshot`] per candle, either in
//! one batch pass or by advancing the last stored snapshot over new candles.
//! Both paths produce bit-identical snapshots for the same history.

use crate::indicators::error::IndicatorError;
use crate::indicators::{
    calculate_kdj_series, calculate_macd_series, calculate_rsi_series, calculate_sma_series,
    next_kdj, next_macd, next_rsi, next_sma, RSI_PERIOD,
};
use crate::models::candle::Candle;
use crate::models::indicators::{IndicatorSnapshot, SmaSet, SMA_WINDOWS};

/// History length from which every SMA window is live
pub const MIN_CANDLES_FOR_EQUIVALENCE: usize = 130;

pub struct SignalEngine;

impl SignalEngine {
    /// Compute a snapshot for every candle of `candles`.
    ///
    /// An SMA window stays `None` on snapshots whose history does not yet
    /// cover it.
    pub fn compute_series(candles: &[Candle]) -> Result<Vec<IndicatorSnapshot>, IndicatorError> {
        if candles.is_empty() {
            return Ok(Vec::new());
        }

        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();

        let mut smas = Vec::with_capacity(SMA_WINDOWS.len());
        for window in SMA_WINDOWS {
            if closes.len() >= window {
                smas.push((window, calculate_sma_series(&closes, window)?));
            }
        }

        let macd = calculate_macd_series(&closes);
        let rsi = calculate_rsi_series(&closes, RSI_PERIOD)?;
        let kdj = calculate_kdj_series(candles);

        let snapshots = candles
            .iter()
            .enumerate()
            .map(|(i, candle)| {
                let mut sma = SmaSet::default();
                for (window, series) in &smas {
                    if i + 1 >= *window {
                        sma.set(*window, Some(series[i]));
                    }
                }

                IndicatorSnapshot {
                    date: candle.date,
                    sma,
                    macd: macd[i],
                    rsi: rsi[i],
                    kdj: kdj[i],
                }
            })
            .collect();

        Ok(snapshots)
    }

    /// Advance `previous` by the last candle of `history`.
    ///
    /// `history` ends with the new candle and includes the candle `previous`
    /// was computed for right before it.
    pub fn advance(
        history: &[Candle],
        previous: &IndicatorSnapshot,
    ) -> Result<IndicatorSnapshot, IndicatorError> {
        if history.len() < 2 {
            return Err(IndicatorError::InsufficientData {
                required: 2,
                available: history.len(),
            });
        }

        let candle = &history[history.len() - 1];
        let last_close = history[history.len() - 2].close;
        let closes: Vec<f64> = history.iter().map(|c| c.close).collect();

        let mut sma = SmaSet::default();
        for window in SMA_WINDOWS {
            let value = match previous.sma.get(window) {
                Some(prev) => Some(next_sma(prev, &closes, window)?),
                // window just became live: seed it from the whole history
                None if closes.len() >= window => calculate_sma_series(&closes, window)?
                    .last()
                    .copied(),
                None => None,
            };
            sma.set(window, value);
        }

        Ok(IndicatorSnapshot {
            date: candle.date,
            sma,
            macd: next_macd(&previous.macd, candle.close),
            rsi: next_rsi(&previous.rsi, last_close, candle.close, RSI_PERIOD)?,
            kdj: next_kdj(&previous.kdj, history)?,
        })
    }

    /// Snapshots for `new_candles`, appended after `history`.
    ///
    /// With a `previous` snapshot matching the last candle of `history` the
    /// new candles are folded in one step at a time. Otherwise the combined
    /// history is recomputed in batch and its tail returned.
    pub fn fold(
        history: &[Candle],
        previous: Option<&IndicatorSnapshot>,
        new_candles: &[Candle],
    ) -> Result<Vec<IndicatorSnapshot>, IndicatorError> {
        if new_candles.is_empty() {
            return Ok(Vec::new());
        }

        let mut combined = Vec::with_capacity(history.len() + new_candles.len());
        combined.extend_from_slice(history);
        combined.extend_from_slice(new_candles);

        let resumable = match (previous, history.last()) {
            (Some(prev), Some(last)) => prev.date == last.date,
            _ => false,
        };

        let Some(previous) = previous.filter(|_| resumable) else {
            let mut all = Self::compute_series(&combined)?;
            return Ok(all.split_off(history.len()));
        };

        let mut out = Vec::with_capacity(new_candles.len());
        let mut state = previous.clone();
        for end in history.len() + 1..=combined.len() {
            state = Self::advance(&combined[..end], &state)?;
            out.push(state.clone());
        }

        Ok(out)
    }
}
