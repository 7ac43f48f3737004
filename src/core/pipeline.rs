//! Ingestion run orchestrator.
//!
//! A run walks `LoadCursors -> Fetch -> Fold -> Screen` and ends in `Done`
//! or `Failed`. Per-security fetch and indicator problems are logged and
//! reported; only storage failures abort a run.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn};

use crate::config::PipelineConfig;
use crate::db::{CandleStore, CursorStore, ScreenStore, SignalStore, Store};
use crate::error::{PipelineError, QuoteError};
use crate::jobs::{FetchCoordinator, FetchJob, FetchOutcome};
use crate::metrics::Metrics;
use crate::models::candle::{Candle, SecurityTimeSeries};
use crate::services::notification::Notifier;
use crate::signals::{screen_securities, SignalEngine};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStage {
    LoadCursors,
    Fetch,
    Fold,
    Screen,
    Done,
    Failed,
}

impl RunStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStage::LoadCursors => "load_cursors",
            RunStage::Fetch => "fetch",
            RunStage::Fold => "fold",
            RunStage::Screen => "screen",
            RunStage::Done => "done",
            RunStage::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedFetch {
    pub identifier: String,
    pub error: String,
}

/// Summary of one pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub stage: RunStage,
    pub securities: usize,
    /// Securities that had at least one new candle stored
    pub fetched: usize,
    /// Securities the provider had nothing newer than the stored history for
    pub no_new_data: usize,
    pub failed: Vec<FailedFetch>,
    /// Securities whose new candles were held back because their indicators
    /// could not be computed
    pub indicator_errors: Vec<String>,
    pub candles_appended: usize,
    pub screened: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunReport {
    fn new() -> Self {
        Self {
            stage: RunStage::LoadCursors,
            securities: 0,
            fetched: 0,
            no_new_data: 0,
            failed: Vec::new(),
            indicator_errors: Vec::new(),
            candles_appended: 0,
            screened: 0,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// True when the run finished and no job or indicator step failed
    pub fn is_fully_successful(&self) -> bool {
        self.stage == RunStage::Done && self.failed.is_empty() && self.indicator_errors.is_empty()
    }

    pub fn failed_identifiers(&self) -> Vec<&str> {
        self.failed.iter().map(|f| f.identifier.as_str()).collect()
    }

    /// One-paragraph text for the run notification
    pub fn summary(&self) -> String {
        let mut message = format!(
            "securities: {}, fetched: {}, no new data: {}, failed: {}, candles appended: {}, screened: {}",
            self.securities,
            self.fetched,
            self.no_new_data,
            self.failed.len(),
            self.candles_appended,
            self.screened
        );
        if !self.failed.is_empty() {
            message.push_str("\nfailed: ");
            message.push_str(&self.failed_identifiers().join(", "));
        }
        if !self.indicator_errors.is_empty() {
            message.push_str("\nindicator errors: ");
            message.push_str(&self.indicator_errors.join(", "));
        }
        message
    }
}

pub struct Pipeline {
    store: Arc<dyn Store>,
    coordinator: FetchCoordinator,
    notifier: Arc<dyn Notifier>,
    metrics: Option<Arc<Metrics>>,
    config: PipelineConfig,
    running: Arc<Mutex<()>>,
}

/// Exclusive claim on the pipeline, held for the duration of one run
pub struct RunGuard {
    _lock: OwnedMutexGuard<()>,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn Store>,
        coordinator: FetchCoordinator,
        notifier: Arc<dyn Notifier>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            coordinator,
            notifier,
            metrics: None,
            config,
            running: Arc::new(Mutex::new(())),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Claim the pipeline without waiting; `None` while a run is in progress
    pub fn try_claim(&self) -> Option<RunGuard> {
        self.running
            .clone()
            .try_lock_owned()
            .ok()
            .map(|lock| RunGuard { _lock: lock })
    }

    /// Execute one full run. Concurrent calls are rejected.
    pub async fn run(&self) -> Result<RunReport, PipelineError> {
        let Some(guard) = self.try_claim() else {
            warn!("Pipeline: run requested while another run is in progress");
            return Err(PipelineError::AlreadyRunning);
        };
        self.run_claimed(guard).await
    }

    /// Execute one full run under a claim taken with [`Pipeline::try_claim`]
    pub async fn run_claimed(&self, _guard: RunGuard) -> Result<RunReport, PipelineError> {
        let started = Instant::now();
        let mut report = RunReport::new();
        info!("Pipeline: run started");

        let result = self.execute(&mut report).await;
        report.finished_at = Some(Utc::now());

        match result {
            Ok(()) => {
                report.stage = RunStage::Done;
                info!(
                    securities = report.securities,
                    fetched = report.fetched,
                    failed = report.failed.len(),
                    candles = report.candles_appended,
                    screened = report.screened,
                    "Pipeline: run done in {:.1}s",
                    started.elapsed().as_secs_f64()
                );
            }
            Err(ref e) => {
                error!(stage = report.stage.as_str(), error = %e, "Pipeline: run failed");
                report.stage = RunStage::Failed;
            }
        }

        if let Some(metrics) = &self.metrics {
            metrics
                .pipeline_runs_total
                .with_label_values(&[report.stage.as_str()])
                .inc();
            metrics
                .pipeline_run_duration_seconds
                .observe(started.elapsed().as_secs_f64());
            metrics
                .candles_appended_total
                .inc_by(report.candles_appended as u64);
        }

        match result {
            Ok(()) => {
                self.notifier
                    .notify("stocker: run complete", &report.summary())
                    .await;
                Ok(report)
            }
            Err(e) => {
                let message = format!("{}\n{}", e, report.summary());
                self.notifier.notify("stocker: run failed", &message).await;
                Err(e)
            }
        }
    }

    async fn execute(&self, report: &mut RunReport) -> Result<(), PipelineError> {
        report.stage = RunStage::LoadCursors;
        let securities = self.load_securities().await?;
        let jobs = self.load_cursors(&securities).await?;
        report.securities = securities.len();

        report.stage = RunStage::Fetch;
        let mut fetched: Vec<(String, Vec<Candle>)> = Vec::new();
        for result in self.coordinator.crawl_all(jobs).await {
            match result.outcome {
                FetchOutcome::Fetched(candles) => fetched.push((result.identifier, candles)),
                FetchOutcome::NoNewData => report.no_new_data += 1,
                FetchOutcome::Failed(e) => report.failed.push(failure(result.identifier, &e)),
            }
        }

        // a security counts as fetched only once new candles were stored
        report.stage = RunStage::Fold;
        for (identifier, candles) in fetched {
            match self.fold_security(&identifier, candles).await? {
                Fold::Appended(count) => {
                    report.fetched += 1;
                    report.candles_appended += count;
                }
                Fold::NothingNew => report.no_new_data += 1,
                Fold::IndicatorError => report.indicator_errors.push(identifier),
            }
        }

        report.stage = RunStage::Screen;
        report.screened = self.screen(&securities).await?;

        Ok(())
    }

    async fn load_securities(&self) -> Result<Vec<String>, PipelineError> {
        self.store
            .securities()
            .await
            .map_err(|e| PipelineError::persistence(RunStage::LoadCursors.as_str(), e))
    }

    /// One fetch job per security, starting the day after its newest candle
    async fn load_cursors(&self, securities: &[String]) -> Result<Vec<FetchJob>, PipelineError> {
        let mut jobs = Vec::with_capacity(securities.len());
        for identifier in securities {
            let last = self
                .store
                .last_candle(identifier)
                .await
                .map_err(|e| PipelineError::persistence(RunStage::LoadCursors.as_str(), e))?;

            let start_date = match last {
                Some(candle) => next_day(candle.date),
                None => self.config.bootstrap_start,
            };
            jobs.push(FetchJob::new(identifier.clone(), start_date));
        }
        Ok(jobs)
    }

    /// Store new candles of one security together with their indicator
    /// snapshots. Candles whose snapshots cannot be computed are not stored,
    /// so the next run fetches them again.
    async fn fold_security(
        &self,
        identifier: &str,
        mut candles: Vec<Candle>,
    ) -> Result<Fold, PipelineError> {
        let stage = RunStage::Fold.as_str();
        let history = SecurityTimeSeries::new(
            identifier,
            self.store
                .history(identifier)
                .await
                .map_err(|e| PipelineError::persistence(stage, e))?,
        );

        candles.sort_by_key(|c| c.date);
        candles.dedup_by_key(|c| c.date);
        let fetched = SecurityTimeSeries::new(identifier, candles);
        let candles = match history.last_date() {
            Some(last) => fetched.tail_after(last),
            None => fetched.candles.as_slice(),
        };

        if candles.is_empty() {
            debug!(identifier = %identifier, "Pipeline: nothing new to fold for {}", identifier);
            return Ok(Fold::NothingNew);
        }

        let previous = self
            .store
            .last_signal(identifier)
            .await
            .map_err(|e| PipelineError::persistence(stage, e))?;

        let snapshots = match SignalEngine::fold(&history.candles, previous.as_ref(), candles) {
            Ok(snapshots) => snapshots,
            Err(e) => {
                warn!(
                    identifier = %identifier,
                    error = %e,
                    "Pipeline: indicator computation failed for {}, candles not stored",
                    identifier
                );
                return Ok(Fold::IndicatorError);
            }
        };

        self.store
            .append(identifier, candles)
            .await
            .map_err(|e| PipelineError::persistence(stage, e))?;
        self.store
            .append_signals(identifier, &snapshots)
            .await
            .map_err(|e| PipelineError::persistence(stage, e))?;

        debug!(
            identifier = %identifier,
            count = candles.len(),
            "Pipeline: appended {} candles for {}",
            candles.len(),
            identifier
        );

        Ok(Fold::Appended(candles.len()))
    }

    /// Replace the screen set from full histories
    async fn screen(&self, securities: &[String]) -> Result<usize, PipelineError> {
        let stage = RunStage::Screen.as_str();
        let mut histories = Vec::with_capacity(securities.len());
        for identifier in securities {
            let candles = self
                .store
                .history(identifier)
                .await
                .map_err(|e| PipelineError::persistence(stage, e))?;
            histories.push((identifier.as_str(), candles));
        }

        let entries = screen_securities(
            histories.iter().map(|(id, c)| (*id, c.as_slice())),
            self.config.kdj_threshold,
        );

        self.store
            .replace_all(&entries)
            .await
            .map_err(|e| PipelineError::persistence(stage, e))?;

        if let Some(metrics) = &self.metrics {
            metrics.screen_entries.set(entries.len() as i64);
        }

        info!(
            screened = entries.len(),
            threshold = self.config.kdj_threshold,
            "Pipeline: {} securities at or below KDJ J {}",
            entries.len(),
            self.config.kdj_threshold
        );

        Ok(entries.len())
    }
}

enum Fold {
    Appended(usize),
    NothingNew,
    IndicatorError,
}

fn next_day(date: NaiveDate) -> NaiveDate {
    date.succ_opt().unwrap_or(date)
}

fn failure(identifier: String, error: &QuoteError) -> FailedFetch {
    FailedFetch {
        identifier,
        error: error.to_string(),
    }
}
