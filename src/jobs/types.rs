//! Job types for the fetch stage

use crate::error::QuoteError;
use crate::models::candle::Candle;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Fetch every bar of `identifier` from `start_date` onwards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchJob {
    pub identifier: String,
    pub start_date: NaiveDate,
}

impl FetchJob {
    pub fn new(identifier: impl Into<String>, start_date: NaiveDate) -> Self {
        Self {
            identifier: identifier.into(),
            start_date,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Fetched(Vec<Candle>),
    NoNewData,
    Failed(QuoteError),
}

impl FetchOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            FetchOutcome::Fetched(_) => "fetched",
            FetchOutcome::NoNewData => "no_new_data",
            FetchOutcome::Failed(_) => "failed",
        }
    }
}

/// Classified result of exactly one [`FetchJob`]
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult {
    pub identifier: String,
    pub outcome: FetchOutcome,
}
