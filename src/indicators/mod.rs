//! Pure indicator recurrences.
//!
//! Each indicator has a batch form over a whole history and a one-step form
//! that advances the previous value by one bar. Batch forms are folds of the
//! one-step forms, so both produce identical floats.

pub mod error;
pub mod momentum;
pub mod trend;

pub use error::IndicatorError;
pub use momentum::*;
pub use trend::*;
