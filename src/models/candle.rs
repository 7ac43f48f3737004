use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Provider-reported daily statistics carried alongside a bar.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DailyStats {
    pub amplitude: f64,
    pub pct_change: f64,
    pub change: f64,
    pub turnover_rate: f64,
}

/// One trading day of a security.
///
/// `low <= {open, close} <= high` is expected but never validated; the
/// indicator code tolerates bars that violate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    /// Turnover value in the quote currency
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<DailyStats>,
}

impl Candle {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume: 0.0,
            value: 0.0,
            stats: None,
        }
    }

    pub fn with_volume(mut self, volume: f64, value: f64) -> Self {
        self.volume = volume;
        self.value = value;
        self
    }

    pub fn with_stats(mut self, stats: DailyStats) -> Self {
        self.stats = Some(stats);
        self
    }
}

/// A security's candle history, ordered by date ascending.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecurityTimeSeries {
    pub identifier: String,
    pub candles: Vec<Candle>,
}

impl SecurityTimeSeries {
    pub fn new(identifier: impl Into<String>, candles: Vec<Candle>) -> Self {
        Self {
            identifier: identifier.into(),
            candles,
        }
    }

    /// Date of the newest stored candle, the cursor for the next fetch
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.candles.last().map(|c| c.date)
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    /// Candles strictly after `date`
    pub fn tail_after(&self, date: NaiveDate) -> &[Candle] {
        let start = self.candles.partition_point(|c| c.date <= date);
        &self.candles[start..]
    }
}
