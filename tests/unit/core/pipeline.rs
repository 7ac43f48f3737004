//! Unit tests for the ingestion pipeline

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use stocker::config::PipelineConfig;
use stocker::core::pipeline::{Pipeline, RunStage};
use stocker::db::{CandleStore, CursorStore, MemoryStore, ScreenStore, SignalStore, TrackingStore};
use stocker::error::{PersistenceError, PipelineError, QuoteError};
use stocker::jobs::{CoordinatorConfig, FetchCoordinator, JobContext};
use stocker::metrics::Metrics;
use stocker::models::{Candle, IndicatorSnapshot, ScreenEntry, Tracking};
use stocker::signals::SignalEngine;

use crate::test_utils::{
    candles_from_closes, date, make_candles, Behavior, MockQuoteSource, RecordingNotifier,
};

fn config() -> PipelineConfig {
    PipelineConfig {
        concurrency: 2,
        request_delay: Duration::ZERO,
        request_timeout: Duration::from_secs(1),
        bootstrap_start: date(2024, 1, 1),
        ..PipelineConfig::default()
    }
}

fn pipeline<S>(store: Arc<S>, source: Arc<MockQuoteSource>, notifier: Arc<RecordingNotifier>) -> Pipeline
where
    S: CursorStore + CandleStore + SignalStore + ScreenStore + TrackingStore + 'static,
{
    let config = config();
    let ctx = Arc::new(JobContext::new(source, None));
    let coordinator = FetchCoordinator::new(ctx, CoordinatorConfig::from(&config));
    Pipeline::new(store, coordinator, notifier, config)
}

fn falling(count: usize) -> Vec<Candle> {
    let closes: Vec<f64> = (0..count).map(|i| 100.0 - i as f64).collect();
    candles_from_closes(&closes, date(2024, 1, 1))
}

#[tokio::test]
async fn test_bootstrap_fetches_from_configured_start() {
    let candles = make_candles(40, date(2024, 1, 1));
    let store = Arc::new(MemoryStore::new().with_securities(["a"]).await);
    let source = Arc::new(MockQuoteSource::new().with("a", Behavior::Series(candles.clone())));

    let report = pipeline(store.clone(), source.clone(), RecordingNotifier::new())
        .run()
        .await
        .unwrap();

    assert_eq!(report.stage, RunStage::Done);
    assert!(report.is_fully_successful());
    assert_eq!(report.candles_appended, 40);
    assert_eq!(source.requested_start("a").await, Some(date(2024, 1, 1)));
    assert_eq!(store.history("a").await.unwrap(), candles);
    assert_eq!(
        store.signals("a").await,
        SignalEngine::compute_series(&candles).unwrap()
    );
}

#[tokio::test]
async fn test_cursor_starts_day_after_last_candle() {
    let candles = make_candles(40, date(2024, 1, 1));
    let store = Arc::new(MemoryStore::new().with_securities(["a"]).await);
    store.append("a", &candles[..30]).await.unwrap();
    store
        .append_signals("a", &SignalEngine::compute_series(&candles[..30]).unwrap())
        .await
        .unwrap();

    let source = Arc::new(MockQuoteSource::new().with("a", Behavior::Series(candles.clone())));
    let report = pipeline(store.clone(), source.clone(), RecordingNotifier::new())
        .run()
        .await
        .unwrap();

    assert_eq!(source.requested_start("a").await, Some(date(2024, 1, 31)));
    assert_eq!(report.candles_appended, 10);
    assert_eq!(
        store.signals("a").await,
        SignalEngine::compute_series(&candles).unwrap()
    );
}

#[tokio::test]
async fn test_consecutive_runs_match_batch_recompute() {
    let candles = make_candles(160, date(2023, 9, 1));
    let store = Arc::new(MemoryStore::new().with_securities(["a"]).await);

    let mut config = config();
    config.bootstrap_start = date(2023, 9, 1);

    for upto in [100, 131, 160] {
        let source = Arc::new(
            MockQuoteSource::new().with("a", Behavior::Series(candles[..upto].to_vec())),
        );
        let ctx = Arc::new(JobContext::new(source, None));
        let coordinator = FetchCoordinator::new(ctx, CoordinatorConfig::from(&config));
        Pipeline::new(store.clone(), coordinator, RecordingNotifier::new(), config.clone())
            .run()
            .await
            .unwrap();
    }

    assert_eq!(store.history("a").await.unwrap().len(), 160);
    assert_eq!(
        store.signals("a").await,
        SignalEngine::compute_series(&candles).unwrap()
    );
}

#[tokio::test]
async fn test_overlapping_and_unsorted_candles_are_filtered() {
    let candles = make_candles(15, date(2024, 1, 1));
    let store = Arc::new(MemoryStore::new().with_securities(["a"]).await);
    store.append("a", &candles[..10]).await.unwrap();

    // provider ignores the cursor and repeats bars out of order
    let mut served: Vec<Candle> = candles.iter().rev().cloned().collect();
    served.push(candles[12].clone());
    let source = Arc::new(MockQuoteSource::new().with("a", Behavior::Fixed(served)));

    let report = pipeline(store.clone(), source, RecordingNotifier::new())
        .run()
        .await
        .unwrap();

    assert_eq!(report.candles_appended, 5);
    assert_eq!(store.history("a").await.unwrap(), candles);
}

#[tokio::test]
async fn test_screen_set_is_replaced() {
    let store = Arc::new(MemoryStore::new().with_securities(["down", "up"]).await);
    store
        .replace_all(&[ScreenEntry {
            identifier: "stale".to_string(),
            kdj_j: -5.0,
        }])
        .await
        .unwrap();

    let rising: Vec<f64> = (0..30).map(|i| 10.0 + i as f64).collect();
    let source = Arc::new(
        MockQuoteSource::new()
            .with("down", Behavior::Series(falling(30)))
            .with("up", Behavior::Series(candles_from_closes(&rising, date(2024, 1, 1)))),
    );

    let report = pipeline(store.clone(), source, RecordingNotifier::new())
        .run()
        .await
        .unwrap();

    let screens = store.screens().await.unwrap();
    assert_eq!(report.screened, 1);
    assert_eq!(screens.len(), 1);
    assert_eq!(screens[0].identifier, "down");
}

#[tokio::test]
async fn test_failed_fetches_are_reported_not_fatal() {
    let store = Arc::new(MemoryStore::new().with_securities(["a", "b", "c"]).await);
    let source = Arc::new(
        MockQuoteSource::new()
            .with("a", Behavior::Series(make_candles(20, date(2024, 1, 1))))
            .with("b", Behavior::Fail(QuoteError::Network("connection reset".into()))),
    );
    let notifier = RecordingNotifier::new();

    let report = pipeline(store.clone(), source, notifier.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(report.stage, RunStage::Done);
    assert!(!report.is_fully_successful());
    assert_eq!(report.fetched, 1);
    assert_eq!(report.no_new_data, 1);
    assert_eq!(report.failed_identifiers(), vec!["b"]);
    assert_eq!(store.history("a").await.unwrap().len(), 20);

    let (topic, message) = notifier.last().await.unwrap();
    assert_eq!(topic, "stocker: run complete");
    assert!(message.contains("failed: b"));
}

#[tokio::test]
async fn test_up_to_date_security_has_no_new_data() {
    let candles = make_candles(10, date(2024, 1, 1));
    let store = Arc::new(MemoryStore::new().with_securities(["a"]).await);
    store.append("a", &candles).await.unwrap();
    let source = Arc::new(MockQuoteSource::new().with("a", Behavior::Series(candles)));

    let report = pipeline(store, source, RecordingNotifier::new())
        .run()
        .await
        .unwrap();

    assert_eq!(report.no_new_data, 1);
    assert_eq!(report.candles_appended, 0);
    assert!(report.is_fully_successful());
}

#[tokio::test]
async fn test_repeated_bars_do_not_count_as_fetched() {
    let candles = make_candles(10, date(2024, 1, 1));
    let store = Arc::new(MemoryStore::new().with_securities(["a"]).await);
    store.append("a", &candles).await.unwrap();

    // provider ignores the cursor and only serves bars already stored
    let source = Arc::new(MockQuoteSource::new().with("a", Behavior::Fixed(candles[5..].to_vec())));

    let report = pipeline(store, source, RecordingNotifier::new())
        .run()
        .await
        .unwrap();

    assert_eq!(report.fetched, 0);
    assert_eq!(report.no_new_data, 1);
    assert_eq!(report.candles_appended, 0);
}

#[tokio::test]
async fn test_indicator_failure_holds_back_candles() {
    let candles = make_candles(5, date(2024, 1, 1));
    let store = Arc::new(MemoryStore::new().with_securities(["a"]).await);
    store.append("a", &candles[..3]).await.unwrap();

    // a stored snapshot claiming an SMA5 the three-candle history cannot roll
    let mut snapshot = SignalEngine::compute_series(&candles[..3]).unwrap()[2].clone();
    snapshot.sma.sma5 = Some(1.0);
    store.append_signals("a", &[snapshot]).await.unwrap();

    let source = Arc::new(MockQuoteSource::new().with("a", Behavior::Series(candles.clone())));
    let report = pipeline(store.clone(), source.clone(), RecordingNotifier::new())
        .run()
        .await
        .unwrap();

    assert_eq!(report.stage, RunStage::Done);
    assert_eq!(report.indicator_errors, vec!["a"]);
    assert_eq!(report.fetched, 0);
    assert_eq!(report.candles_appended, 0);
    assert!(!report.is_fully_successful());
    assert_eq!(store.history("a").await.unwrap(), candles[..3].to_vec());
    assert_eq!(store.signals("a").await.len(), 1);

    // the held back candles are requested again
    pipeline(store, source.clone(), RecordingNotifier::new())
        .run()
        .await
        .unwrap();
    let starts: Vec<_> = source.requests.lock().await.iter().map(|(_, d)| *d).collect();
    assert_eq!(starts, vec![date(2024, 1, 4), date(2024, 1, 4)]);
}

/// Store whose candle appends always fail
#[derive(Default)]
struct FailingStore {
    inner: MemoryStore,
}

#[async_trait]
impl CursorStore for FailingStore {
    async fn securities(&self) -> Result<Vec<String>, PersistenceError> {
        Ok(vec!["a".to_string()])
    }

    async fn last_candle(&self, identifier: &str) -> Result<Option<Candle>, PersistenceError> {
        self.inner.last_candle(identifier).await
    }

    async fn register(&self, identifier: &str) -> Result<bool, PersistenceError> {
        self.inner.register(identifier).await
    }

    async fn unregister(&self, identifier: &str) -> Result<bool, PersistenceError> {
        self.inner.unregister(identifier).await
    }
}

#[async_trait]
impl CandleStore for FailingStore {
    async fn append(&self, _identifier: &str, _candles: &[Candle]) -> Result<(), PersistenceError> {
        Err(PersistenceError::Unavailable("disk full".to_string()))
    }

    async fn history(&self, identifier: &str) -> Result<Vec<Candle>, PersistenceError> {
        self.inner.history(identifier).await
    }
}

#[async_trait]
impl SignalStore for FailingStore {
    async fn last_signal(
        &self,
        identifier: &str,
    ) -> Result<Option<IndicatorSnapshot>, PersistenceError> {
        self.inner.last_signal(identifier).await
    }

    async fn append_signals(
        &self,
        identifier: &str,
        snapshots: &[IndicatorSnapshot],
    ) -> Result<(), PersistenceError> {
        self.inner.append_signals(identifier, snapshots).await
    }
}

#[async_trait]
impl ScreenStore for FailingStore {
    async fn replace_all(&self, entries: &[ScreenEntry]) -> Result<(), PersistenceError> {
        self.inner.replace_all(entries).await
    }

    async fn screens(&self) -> Result<Vec<ScreenEntry>, PersistenceError> {
        self.inner.screens().await
    }
}

#[async_trait]
impl TrackingStore for FailingStore {
    async fn trackings(&self) -> Result<Vec<Tracking>, PersistenceError> {
        self.inner.trackings().await
    }

    async fn track(&self, tracking: &Tracking) -> Result<(), PersistenceError> {
        self.inner.track(tracking).await
    }

    async fn untrack(&self, identifier: &str) -> Result<bool, PersistenceError> {
        self.inner.untrack(identifier).await
    }
}

#[tokio::test]
async fn test_persistence_failure_aborts_run() {
    let store = Arc::new(FailingStore::default());
    let previous = ScreenEntry {
        identifier: "kept".to_string(),
        kdj_j: 1.0,
    };
    store.replace_all(std::slice::from_ref(&previous)).await.unwrap();

    let source = Arc::new(
        MockQuoteSource::new().with("a", Behavior::Series(make_candles(20, date(2024, 1, 1)))),
    );
    let notifier = RecordingNotifier::new();

    let result = pipeline(store.clone(), source, notifier.clone()).run().await;

    match result {
        Err(PipelineError::Persistence { stage, .. }) => assert_eq!(stage, "fold"),
        other => panic!("expected persistence failure, got {:?}", other.map(|r| r.stage)),
    }

    let (topic, message) = notifier.last().await.unwrap();
    assert_eq!(topic, "stocker: run failed");
    assert!(message.contains("disk full"));
    assert_eq!(store.screens().await.unwrap(), vec![previous]);
}

#[tokio::test]
async fn test_concurrent_run_is_rejected() {
    let store = Arc::new(MemoryStore::new().with_securities(["slow"]).await);
    let source = Arc::new(
        MockQuoteSource::new().with("slow", Behavior::Sleep(Duration::from_millis(300))),
    );
    let pipeline = Arc::new(pipeline(store, source, RecordingNotifier::new()));

    let first = {
        let pipeline = pipeline.clone();
        tokio::spawn(async move { pipeline.run().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(matches!(
        pipeline.run().await,
        Err(PipelineError::AlreadyRunning)
    ));
    assert!(first.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_run_metrics_recorded() {
    let metrics = Arc::new(Metrics::new().unwrap());
    let store = Arc::new(MemoryStore::new().with_securities(["down"]).await);
    let source = Arc::new(MockQuoteSource::new().with("down", Behavior::Series(falling(30))));

    pipeline(store, source, RecordingNotifier::new())
        .with_metrics(metrics.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(metrics.pipeline_runs_total.with_label_values(&["done"]).get(), 1);
    assert_eq!(metrics.candles_appended_total.get(), 30);
    assert_eq!(metrics.screen_entries.get(), 1);
}
