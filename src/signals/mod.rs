//! Indicator snapshots and screening.

pub mod engine;
pub mod screening;

pub use engine::*;
pub use screening::*;
