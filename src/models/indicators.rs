use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// SMA windows tracked for every security
pub const SMA_WINDOWS: [usize; 6] = [5, 10, 20, 30, 90, 120];

/// Simple moving averages; `None` until the history covers the window.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SmaSet {
    pub sma5: Option<f64>,
    pub sma10: Option<f64>,
    pub sma20: Option<f64>,
    pub sma30: Option<f64>,
    pub sma90: Option<f64>,
    pub sma120: Option<f64>,
}

impl SmaSet {
    pub fn get(&self, window: usize) -> Option<f64> {
        match window {
            5 => self.sma5,
            10 => self.sma10,
            20 => self.sma20,
            30 => self.sma30,
            90 => self.sma90,
            120 => self.sma120,
            _ => None,
        }
    }

    pub fn set(&mut self, window: usize, value: Option<f64>) {
        match window {
            5 => self.sma5 = value,
            10 => self.sma10 = value,
            20 => self.sma20 = value,
            30 => self.sma30 = value,
            90 => self.sma90 = value,
            120 => self.sma120 = value,
            _ => {}
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MacdState {
    pub ema12: f64,
    pub ema26: f64,
    pub diff: f64,
    pub dea: f64,
    pub hist: f64,
}

/// RSI value with the smoothed gain/loss needed for the next step
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RsiState {
    pub rsi: f64,
    pub rs_gain: f64,
    pub rs_loss: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct KdjState {
    pub rsv: f64,
    pub k: f64,
    pub d: f64,
    pub j: f64,
}

/// All indicator state for one security on one date.
///
/// The latest snapshot is what the next run resumes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub date: NaiveDate,
    pub sma: SmaSet,
    pub macd: MacdState,
    pub rsi: RsiState,
    pub kdj: KdjState,
}
