//! Shared data models spanning the engine layers.

pub mod candle;
pub mod indicators;
pub mod screen;

pub use candle::{Candle, DailyStats, SecurityTimeSeries};
pub use indicators::{IndicatorSnapshot, KdjState, MacdState, RsiState, SmaSet, SMA_WINDOWS};
pub use screen::{ScreenEntry, ScreenView, Tracking, TrackingView};
