use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A security that passed the KDJ screen on the latest run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenEntry {
    pub identifier: String,
    pub kdj_j: f64,
}

/// A security the user follows from a given date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tracking {
    pub identifier: String,
    pub name: String,
    pub started: NaiveDate,
}

/// Screen entry enriched with tracking state and the latest bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenView {
    pub identifier: String,
    pub kdj_j: f64,
    pub tracked: bool,
    pub latest_date: Option<NaiveDate>,
    pub latest_close: Option<f64>,
    pub daily_value: Option<f64>,
}

/// Performance of a tracked security since it started being tracked
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingView {
    pub identifier: String,
    pub name: String,
    pub started: NaiveDate,
    pub latest_close: Option<f64>,
    /// Fractional close change since `started`, `0.0` without candles
    pub change: f64,
}
