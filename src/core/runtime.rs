//! Service wiring shared by the binaries

use crate::config::{self, PipelineConfig};
use crate::core::pipeline::Pipeline;
use crate::core::query::ScreenQuery;
use crate::db::{CursorStore, MemoryStore, PostgresStore, Store};
use crate::jobs::{CoordinatorConfig, FetchCoordinator, JobContext};
use crate::metrics::Metrics;
use crate::services::eastmoney::EastmoneyQuoteSource;
use crate::services::market_data::QuoteSource;
use crate::services::notification::{LogNotifier, Notifier, PushbulletNotifier};
use std::sync::Arc;
use tracing::{info, warn};

/// Fully wired pipeline, query layer and metrics
pub struct ServiceRuntime {
    pub config: PipelineConfig,
    pub metrics: Arc<Metrics>,
    pub store: Arc<dyn Store>,
    pub pipeline: Arc<Pipeline>,
    pub query: Arc<ScreenQuery>,
}

impl ServiceRuntime {
    /// Assemble the runtime from explicit parts
    pub fn new(
        config: PipelineConfig,
        metrics: Arc<Metrics>,
        store: Arc<dyn Store>,
        source: Arc<dyn QuoteSource>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let ctx = Arc::new(JobContext::new(source, Some(metrics.clone())));
        let coordinator = FetchCoordinator::new(ctx, CoordinatorConfig::from(&config));
        let pipeline = Arc::new(
            Pipeline::new(store.clone(), coordinator, notifier, config.clone())
                .with_metrics(metrics.clone()),
        );
        let query = Arc::new(ScreenQuery::new(store.clone(), config.kdj_threshold));

        Self {
            config,
            metrics,
            store,
            pipeline,
            query,
        }
    }

    /// Build from environment variables.
    ///
    /// Uses PostgreSQL when `DATABASE_URL` is set and an in-memory store
    /// otherwise; Pushbullet when `PUSHBULLET_TOKEN` is set and log
    /// notifications otherwise.
    pub async fn from_env() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let config = PipelineConfig::from_env();
        let metrics = Arc::new(Metrics::new().map_err(|e| format!("metrics init failed: {}", e))?);
        let securities = config::get_securities();

        let store: Arc<dyn Store> = match config::get_database_url() {
            Some(url) => {
                let db = PostgresStore::connect(&url).await?;
                for identifier in &securities {
                    db.register(identifier).await?;
                }
                metrics.database_connected.set(1.0);
                info!("ServiceRuntime: using PostgreSQL store");
                Arc::new(db)
            }
            None => {
                warn!("ServiceRuntime: DATABASE_URL not set, using in-memory store");
                Arc::new(MemoryStore::new().with_securities(securities).await)
            }
        };

        let notifier: Arc<dyn Notifier> = match config::get_pushbullet_token() {
            Some(token) => Arc::new(PushbulletNotifier::new(token)),
            None => Arc::new(LogNotifier),
        };

        let source: Arc<dyn QuoteSource> = Arc::new(EastmoneyQuoteSource::with_client(
            config.eastmoney_base_url.clone(),
            reqwest::Client::new(),
        ));

        info!(
            concurrency = config.concurrency,
            delay_secs = config.request_delay.as_secs(),
            timeout_secs = config.request_timeout.as_secs(),
            threshold = config.kdj_threshold,
            "ServiceRuntime: pipeline configured"
        );

        Ok(Self::new(config, metrics, store, source, notifier))
    }
}
