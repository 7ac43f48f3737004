//! Test utilities for worker integration tests

use std::sync::Arc;
use std::time::Duration;
use stocker::config::PipelineConfig;
use stocker::core::runtime::ServiceRuntime;
use stocker::db::MemoryStore;
use stocker::metrics::Metrics;
use stocker::services::eastmoney::EastmoneyQuoteSource;
use wiremock::MockServer;

use crate::test_utils::{date, RecordingNotifier};

/// Test helper wiring a full runtime to a mock quote endpoint
#[allow(dead_code)]
pub struct TestWorker {
    pub runtime: ServiceRuntime,
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub eastmoney: MockServer,
}

impl TestWorker {
    pub async fn new(securities: &[&str]) -> Self {
        let eastmoney = MockServer::start().await;

        let config = PipelineConfig {
            concurrency: 2,
            request_delay: Duration::ZERO,
            request_timeout: Duration::from_secs(2),
            bootstrap_start: date(2024, 1, 1),
            eastmoney_base_url: eastmoney.uri(),
            ..PipelineConfig::default()
        };

        let store = Arc::new(
            MemoryStore::new()
                .with_securities(securities.iter().copied())
                .await,
        );
        let notifier = RecordingNotifier::new();
        let source = Arc::new(EastmoneyQuoteSource::with_client(
            config.eastmoney_base_url.clone(),
            reqwest::Client::new(),
        ));
        let metrics = Arc::new(Metrics::new().expect("metrics initialization"));

        let runtime = ServiceRuntime::new(config, metrics, store.clone(), source, notifier.clone());

        Self {
            runtime,
            store,
            notifier,
            eastmoney,
        }
    }

    /// `beg` query values of every kline request received so far
    pub async fn requested_starts(&self, secid: &str) -> Vec<String> {
        self.eastmoney
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.query_pairs().any(|(k, v)| k == "secid" && v == secid))
            .filter_map(|r| {
                r.url
                    .query_pairs()
                    .find(|(k, _)| k == "beg")
                    .map(|(_, v)| v.into_owned())
            })
            .collect()
    }
}
