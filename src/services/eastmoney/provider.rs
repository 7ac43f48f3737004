//! HTTP client for the Eastmoney kline endpoint

use async_trait::async_trait;
use chrono::NaiveDate;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::parser::parse_response;
use crate::config::DEFAULT_EASTMONEY_BASE_URL;
use crate::error::QuoteError;
use crate::models::candle::Candle;
use crate::services::market_data::QuoteSource;

const KLINE_PATH: &str = "/api/qt/stock/kline/get";
const CALLBACK: &str = "jQuery35104990802373722225_1708415137417";
const UT: &str = "fa5fd1943c7b386f172d6893dbfba10b";
const FIELDS1: &str = "f1,f2,f3,f4,f5,f6";
const FIELDS2: &str = "f51,f52,f53,f54,f55,f56,f57,f58,f59,f60,f61";
/// Daily bars
const KLT_DAILY: &str = "101";
/// Forward-adjusted prices
const FQT_FORWARD: &str = "1";
const END_OPEN: &str = "21000101";

pub struct EastmoneyQuoteSource {
    client: reqwest::Client,
    base_url: String,
}

impl EastmoneyQuoteSource {
    pub fn new() -> Self {
        Self::with_client(DEFAULT_EASTMONEY_BASE_URL, reqwest::Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Build the kline request URL for `identifier` starting at `from`.
    pub fn kline_url(&self, identifier: &str, from: NaiveDate) -> Result<Url, QuoteError> {
        let mut url = Url::parse(self.base_url.trim_end_matches('/'))
            .and_then(|base| base.join(KLINE_PATH))
            .map_err(|e| QuoteError::Network(format!("invalid base url: {}", e)))?;

        url.query_pairs_mut()
            .append_pair("cb", CALLBACK)
            .append_pair("secid", identifier)
            .append_pair("ut", UT)
            .append_pair("fields1", FIELDS1)
            .append_pair("fields2", FIELDS2)
            .append_pair("klt", KLT_DAILY)
            .append_pair("fqt", FQT_FORWARD)
            .append_pair("beg", &from.format("%Y%m%d").to_string())
            .append_pair("end", END_OPEN);

        Ok(url)
    }
}

impl Default for EastmoneyQuoteSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QuoteSource for EastmoneyQuoteSource {
    fn name(&self) -> &'static str {
        "eastmoney"
    }

    async fn fetch(
        &self,
        identifier: &str,
        from: NaiveDate,
        deadline: Duration,
    ) -> Result<Vec<Candle>, QuoteError> {
        let url = self.kline_url(identifier, from)?;

        let response = self
            .client
            .get(url)
            .timeout(deadline)
            .send()
            .await
            .map_err(|e| classify(e, deadline))?;

        let status = response.status();
        if !status.is_success() {
            return Err(QuoteError::Network(format!(
                "unexpected status {} for {}",
                status, identifier
            )));
        }

        let body = response.text().await.map_err(|e| classify(e, deadline))?;
        let candles = parse_response(identifier, &body)?;

        debug!(
            identifier = %identifier,
            count = candles.len(),
            "Eastmoney: fetched {} klines for {}",
            candles.len(),
            identifier
        );

        Ok(candles)
    }
}

fn classify(err: reqwest::Error, deadline: Duration) -> QuoteError {
    if err.is_timeout() {
        QuoteError::Timeout(deadline)
    } else {
        QuoteError::from(err)
    }
}
