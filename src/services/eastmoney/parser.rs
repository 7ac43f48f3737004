//! Kline response decoding.
//!
//! The endpoint answers with a JSONP envelope, `jQuery...({...});`, whose
//! payload holds the bars as comma separated records:
//! `date,open,close,high,low,volume,value,amplitude,pct_change,change,turnover_rate`.

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::warn;

use crate::error::QuoteError;
use crate::models::candle::{Candle, DailyStats};

#[derive(Debug, Deserialize)]
struct KlineResponse {
    data: Option<KlineData>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct KlineData {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    market: Option<i64>,
    #[serde(default)]
    klines: Vec<String>,
}

/// Return the JSON payload between the first `(` and the last `)`.
pub fn strip_envelope(body: &str) -> Result<&str, QuoteError> {
    let open = body
        .find('(')
        .ok_or_else(|| QuoteError::Parse("missing '(' in response envelope".to_string()))?;
    let close = body
        .rfind(')')
        .ok_or_else(|| QuoteError::Parse("missing ')' in response envelope".to_string()))?;

    if close <= open {
        return Err(QuoteError::Parse(
            "response envelope closes before it opens".to_string(),
        ));
    }

    Ok(&body[open + 1..close])
}

/// Missing or malformed numeric fields read as `0.0`.
fn field(parts: &[&str], idx: usize) -> f64 {
    parts
        .get(idx)
        .and_then(|v| v.trim().parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// Parse one kline record. Returns `None` when the date is unreadable.
pub fn parse_kline(record: &str) -> Option<Candle> {
    let parts: Vec<&str> = record.split(',').collect();
    let date = NaiveDate::parse_from_str(parts.first()?.trim(), "%Y-%m-%d").ok()?;

    let candle = Candle::new(
        date,
        field(&parts, 1),
        field(&parts, 3),
        field(&parts, 4),
        field(&parts, 2),
    )
    .with_volume(field(&parts, 5), field(&parts, 6))
    .with_stats(DailyStats {
        amplitude: field(&parts, 7),
        pct_change: field(&parts, 8),
        change: field(&parts, 9),
        turnover_rate: field(&parts, 10),
    });

    Some(candle)
}

/// Decode a full response body into candles ordered as the provider sent them.
pub fn parse_response(identifier: &str, body: &str) -> Result<Vec<Candle>, QuoteError> {
    let payload = strip_envelope(body)?;
    let response: KlineResponse =
        serde_json::from_str(payload).map_err(|e| QuoteError::Parse(e.to_string()))?;

    let klines = match response.data {
        Some(data) if !data.klines.is_empty() => data.klines,
        _ => return Err(QuoteError::Empty),
    };

    let mut candles = Vec::with_capacity(klines.len());
    for record in &klines {
        match parse_kline(record) {
            Some(candle) => candles.push(candle),
            None => warn!(
                identifier = %identifier,
                record = %record,
                "Eastmoney: dropping kline with unreadable date for {}",
                identifier
            ),
        }
    }

    if candles.is_empty() {
        return Err(QuoteError::Parse(format!(
            "no readable klines among {} records",
            klines.len()
        )));
    }

    Ok(candles)
}
