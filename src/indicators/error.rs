use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum IndicatorError {
    #[error("invalid window {window} for series of length {len}")]
    InvalidWindow { window: usize, len: usize },

    #[error("insufficient data: need {required} points, have {available}")]
    InsufficientData { required: usize, available: usize },
}
