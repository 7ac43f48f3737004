//! Unit tests for SMA indicator

use stocker::indicators::trend::{calculate_sma_series, next_sma};
use stocker::indicators::IndicatorError;

use crate::test_utils::assert_close;

const CLOSES: [f64; 10] = [10.0, 12.0, 11.0, 13.0, 15.0, 14.0, 16.0, 18.0, 17.0, 19.0];

#[test]
fn test_sma_seed_is_flat_mean_of_first_window() {
    let sma = calculate_sma_series(&CLOSES, 5).unwrap();
    assert_eq!(sma.len(), CLOSES.len());
    for value in &sma[..5] {
        assert_close(*value, 12.2);
    }
}

#[test]
fn test_sma_rolls_forward() {
    let sma = calculate_sma_series(&CLOSES, 5).unwrap();
    assert_close(sma[5], 13.0);
    assert_close(sma[6], 13.8);
    assert_close(sma[7], 15.2);
    assert_close(sma[9], 16.8);
}

#[test]
fn test_sma_matches_plain_mean_after_seed() {
    let sma = calculate_sma_series(&CLOSES, 5).unwrap();
    for i in 5..CLOSES.len() {
        let mean = CLOSES[i + 1 - 5..=i].iter().sum::<f64>() / 5.0;
        assert!((sma[i] - mean).abs() < 1e-9);
    }
}

#[test]
fn test_sma_window_equal_to_length_is_allowed() {
    let sma = calculate_sma_series(&CLOSES, 10).unwrap();
    let mean = CLOSES.iter().sum::<f64>() / 10.0;
    assert!(sma.iter().all(|v| (*v - mean).abs() < 1e-12));
}

#[test]
fn test_sma_invalid_windows() {
    assert_eq!(
        calculate_sma_series(&CLOSES, 0),
        Err(IndicatorError::InvalidWindow { window: 0, len: 10 })
    );
    assert_eq!(
        calculate_sma_series(&CLOSES, 11),
        Err(IndicatorError::InvalidWindow { window: 11, len: 10 })
    );
    assert!(calculate_sma_series(&[], 1).is_err());
}

#[test]
fn test_next_sma_equals_batch_bitwise() {
    let batch = calculate_sma_series(&CLOSES, 5).unwrap();
    for i in 5..CLOSES.len() {
        let step = next_sma(batch[i - 1], &CLOSES[..=i], 5).unwrap();
        assert_eq!(step, batch[i]);
    }
}

#[test]
fn test_next_sma_needs_leaving_close() {
    assert_eq!(
        next_sma(12.2, &CLOSES[..5], 5),
        Err(IndicatorError::InsufficientData {
            required: 6,
            available: 5
        })
    );
}
