//! Momentum indicators: MACD, RSI, KDJ

pub mod kdj;
pub mod macd;
pub mod rsi;

pub use kdj::*;
pub use macd::*;
pub use rsi::*;
