//! Unit tests for RSI indicator

use stocker::indicators::momentum::{calculate_rsi_series, next_rsi, RSI_PERIOD};
use stocker::indicators::IndicatorError;
use stocker::models::RsiState;

use crate::test_utils::assert_close;

#[test]
fn test_rsi_first_bar_is_zero() {
    let rsi = calculate_rsi_series(&[10.0, 11.0, 12.0], RSI_PERIOD).unwrap();
    assert_eq!(rsi[0], RsiState::default());
}

#[test]
fn test_rsi_monotonic_series_is_zero() {
    let up: Vec<f64> = (0..30).map(|i| 10.0 + i as f64).collect();
    let down: Vec<f64> = up.iter().rev().copied().collect();

    for closes in [up, down] {
        let rsi = calculate_rsi_series(&closes, RSI_PERIOD).unwrap();
        assert!(rsi.iter().all(|s| s.rsi == 0.0));
    }
}

#[test]
fn test_rsi_mixed_moves() {
    let rsi = calculate_rsi_series(&[1.0, 2.0, 1.0], RSI_PERIOD).unwrap();

    assert_close(rsi[1].rs_gain, 1.0 / 6.0);
    assert_eq!(rsi[1].rs_loss, 0.0);
    assert_eq!(rsi[1].rsi, 0.0);

    assert_close(rsi[2].rs_gain, 5.0 / 36.0);
    assert_close(rsi[2].rs_loss, 1.0 / 6.0);
    assert_close(rsi[2].rsi, 100.0 * 5.0 / 11.0);
}

#[test]
fn test_rsi_empty_and_invalid_period() {
    assert!(calculate_rsi_series(&[], RSI_PERIOD).unwrap().is_empty());
    assert!(matches!(
        calculate_rsi_series(&[1.0, 2.0], 0),
        Err(IndicatorError::InvalidWindow { window: 0, .. })
    ));
}

#[test]
fn test_rsi_stays_in_range() {
    let closes: Vec<f64> = (0..80).map(|i| 20.0 + ((i as f64) * 1.3).sin() * 3.0).collect();
    let rsi = calculate_rsi_series(&closes, RSI_PERIOD).unwrap();
    assert!(rsi.iter().all(|s| (0.0..=100.0).contains(&s.rsi)));
}

#[test]
fn test_next_rsi_applies_zero_guard() {
    // a previous flat period leaves zero smoothed loss after a gain
    let state = next_rsi(&RsiState::default(), 10.0, 11.0, RSI_PERIOD).unwrap();
    assert_eq!(state.rsi, 0.0);
    assert!(state.rs_gain > 0.0);
}

#[test]
fn test_next_rsi_equals_batch_bitwise() {
    let closes: Vec<f64> = (0..50).map(|i| 30.0 + ((i as f64) * 0.9).sin() * 4.0).collect();
    let batch = calculate_rsi_series(&closes, RSI_PERIOD).unwrap();
    for i in 1..closes.len() {
        let step = next_rsi(&batch[i - 1], closes[i - 1], closes[i], RSI_PERIOD).unwrap();
        assert_eq!(step, batch[i]);
    }
}
