//! Integration tests for the Worker
//!
//! Runs the full pipeline against a mock Eastmoney endpoint.

#[path = "worker/test_utils.rs"]
mod test_utils;

use stocker::core::pipeline::RunStage;
use stocker::db::{CandleStore, ScreenStore};
use stocker::signals::SignalEngine;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::test_utils::{date, jsonp_body, kline_records};
use test_utils::TestWorker;

const KLINE_PATH: &str = "/api/qt/stock/kline/get";

fn falling(count: usize) -> Vec<f64> {
    (0..count).map(|i| 60.0 - i as f64 * 0.5).collect()
}

fn rising(count: usize) -> Vec<f64> {
    (0..count).map(|i| 20.0 + i as f64 * 0.5).collect()
}

#[tokio::test]
async fn worker_run_ingests_folds_and_screens() {
    let worker = TestWorker::new(&["1.600519", "0.000001", "0.300750"]).await;

    Mock::given(method("GET"))
        .and(path(KLINE_PATH))
        .and(query_param("secid", "1.600519"))
        .respond_with(ResponseTemplate::new(200).set_body_string(jsonp_body(
            "600519",
            1,
            &kline_records(date(2024, 1, 1), &falling(40)),
        )))
        .mount(&worker.eastmoney)
        .await;
    Mock::given(method("GET"))
        .and(path(KLINE_PATH))
        .and(query_param("secid", "0.300750"))
        .respond_with(ResponseTemplate::new(200).set_body_string(jsonp_body(
            "300750",
            0,
            &kline_records(date(2024, 1, 1), &rising(40)),
        )))
        .mount(&worker.eastmoney)
        .await;
    Mock::given(method("GET"))
        .and(path(KLINE_PATH))
        .and(query_param("secid", "0.000001"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&worker.eastmoney)
        .await;

    let report = worker.runtime.pipeline.run().await.unwrap();

    assert_eq!(report.stage, RunStage::Done);
    assert_eq!(report.securities, 3);
    assert_eq!(report.fetched, 2);
    assert_eq!(report.failed_identifiers(), vec!["0.000001"]);
    assert_eq!(report.candles_appended, 80);
    assert_eq!(worker.requested_starts("1.600519").await, vec!["20240101"]);

    let history = worker.store.history("1.600519").await.unwrap();
    assert_eq!(history.len(), 40);
    assert_eq!(
        worker.store.signals("1.600519").await,
        SignalEngine::compute_series(&history).unwrap()
    );

    let screens = worker.store.screens().await.unwrap();
    assert_eq!(screens.len(), 1);
    assert_eq!(screens[0].identifier, "1.600519");

    let (topic, message) = worker.notifier.last().await.unwrap();
    assert_eq!(topic, "stocker: run complete");
    assert!(message.contains("0.000001"));

    let fetched = worker
        .runtime
        .metrics
        .fetch_results_total
        .with_label_values(&["fetched"])
        .get();
    assert_eq!(fetched, 2);
}

#[tokio::test]
async fn worker_second_run_resumes_from_cursor() {
    let worker = TestWorker::new(&["1.600519"]).await;
    let closes = falling(50);

    // first run sees 45 bars, the second run sees all 50
    Mock::given(method("GET"))
        .and(path(KLINE_PATH))
        .and(query_param("beg", "20240101"))
        .respond_with(ResponseTemplate::new(200).set_body_string(jsonp_body(
            "600519",
            1,
            &kline_records(date(2024, 1, 1), &closes[..45]),
        )))
        .mount(&worker.eastmoney)
        .await;
    Mock::given(method("GET"))
        .and(path(KLINE_PATH))
        .and(query_param("beg", "20240215"))
        .respond_with(ResponseTemplate::new(200).set_body_string(jsonp_body(
            "600519",
            1,
            &kline_records(date(2024, 1, 1), &closes),
        )))
        .mount(&worker.eastmoney)
        .await;

    let first = worker.runtime.pipeline.run().await.unwrap();
    assert_eq!(first.candles_appended, 45);

    // the endpoint resends the whole series; only the five new bars are kept
    let second = worker.runtime.pipeline.run().await.unwrap();
    assert_eq!(second.candles_appended, 5);
    assert_eq!(
        worker.requested_starts("1.600519").await,
        vec!["20240101", "20240215"]
    );

    let history = worker.store.history("1.600519").await.unwrap();
    assert_eq!(history.len(), 50);
    assert_eq!(
        worker.store.signals("1.600519").await,
        SignalEngine::compute_series(&history).unwrap()
    );
}

#[tokio::test]
async fn worker_run_with_unreachable_source_still_completes() {
    let worker = TestWorker::new(&["1.600519", "0.000001"]).await;

    let report = worker.runtime.pipeline.run().await.unwrap();

    // unmatched requests get a 404 from the mock server
    assert_eq!(report.stage, RunStage::Done);
    assert_eq!(report.failed.len(), 2);
    assert_eq!(report.candles_appended, 0);
    assert!(worker.store.screens().await.unwrap().is_empty());
}
