//! Quote source interface for daily bar providers.

use crate::error::QuoteError;
use crate::models::candle::Candle;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::time::Duration;

#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Provider name used in logs and metric labels
    fn name(&self) -> &'static str;

    /// Fetch daily bars for `identifier` from `from` (inclusive) onwards.
    ///
    /// Makes one outbound request bounded by `deadline`. A range with no bars
    /// is reported as [`QuoteError::Empty`].
    async fn fetch(
        &self,
        identifier: &str,
        from: NaiveDate,
        deadline: Duration,
    ) -> Result<Vec<Candle>, QuoteError>;
}
