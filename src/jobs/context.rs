//! Job context for dependency injection

use crate::metrics::Metrics;
use crate::services::market_data::QuoteSource;
use std::sync::Arc;

/// Dependencies shared by every fetch worker
pub struct JobContext {
    pub source: Arc<dyn QuoteSource>,
    pub metrics: Option<Arc<Metrics>>,
}

impl JobContext {
    pub fn new(source: Arc<dyn QuoteSource>, metrics: Option<Arc<Metrics>>) -> Self {
        Self { source, metrics }
    }
}
