//! Bounded-concurrency fetch coordinator.
//!
//! A fixed pool of workers drains a job queue that is filled and closed up
//! front. Every job produces exactly one [`FetchResult`]; the coordinator
//! collects exactly as many results as there were jobs.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use crate::config::PipelineConfig;
use crate::error::QuoteError;
use crate::jobs::context::JobContext;
use crate::jobs::types::{FetchJob, FetchOutcome, FetchResult};

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub concurrency: usize,
    pub request_delay: Duration,
    pub request_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

impl From<&PipelineConfig> for CoordinatorConfig {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            concurrency: config.concurrency,
            request_delay: config.request_delay,
            request_timeout: config.request_timeout,
        }
    }
}

pub struct FetchCoordinator {
    ctx: Arc<JobContext>,
    config: CoordinatorConfig,
}

impl FetchCoordinator {
    pub fn new(ctx: Arc<JobContext>, config: CoordinatorConfig) -> Self {
        Self { ctx, config }
    }

    /// Run every job and return one result per job, in completion order.
    pub async fn crawl_all(&self, jobs: Vec<FetchJob>) -> Vec<FetchResult> {
        if jobs.is_empty() {
            return Vec::new();
        }

        let total = jobs.len();
        let concurrency = self.config.concurrency.max(1).min(total);

        let mut expected: HashMap<String, usize> = HashMap::new();
        for job in &jobs {
            *expected.entry(job.identifier.clone()).or_default() += 1;
        }

        let (job_tx, job_rx) = mpsc::channel::<FetchJob>(total);
        for job in jobs {
            // capacity equals the job count, so this never waits
            if job_tx.send(job).await.is_err() {
                break;
            }
        }
        drop(job_tx);

        let job_rx = Arc::new(Mutex::new(job_rx));
        let (result_tx, mut result_rx) = mpsc::channel::<FetchResult>(total);

        info!(
            jobs = total,
            concurrency = concurrency,
            "FetchCoordinator: starting {} jobs with {} workers",
            total,
            concurrency
        );

        let mut handles = Vec::with_capacity(concurrency);
        for worker_id in 0..concurrency {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let ctx = self.ctx.clone();
            let config = self.config.clone();

            handles.push(tokio::spawn(async move {
                loop {
                    let job = {
                        let mut rx = job_rx.lock().await;
                        rx.recv().await
                    };
                    let Some(job) = job else { break };

                    tokio::time::sleep(config.request_delay).await;
                    let result = run_job(&ctx, &config, job).await;
                    debug!(
                        worker = worker_id,
                        identifier = %result.identifier,
                        outcome = result.outcome.label(),
                        "FetchCoordinator: worker {} finished {}",
                        worker_id,
                        result.identifier
                    );

                    if result_tx.send(result).await.is_err() {
                        break;
                    }
                }
            }));
        }
        drop(result_tx);

        let mut results = Vec::with_capacity(total);
        while results.len() < total {
            match result_rx.recv().await {
                Some(result) => results.push(result),
                // every worker has exited
                None => break,
            }
        }

        for outcome in join_all(handles).await {
            if let Err(e) = outcome {
                error!(error = %e, "FetchCoordinator: worker terminated abnormally");
            }
        }

        if results.len() < total {
            for result in &results {
                if let Some(count) = expected.get_mut(&result.identifier) {
                    *count = count.saturating_sub(1);
                }
            }
            for (identifier, missing) in expected {
                for _ in 0..missing {
                    warn!(
                        identifier = %identifier,
                        "FetchCoordinator: no result reported for {}",
                        identifier
                    );
                    results.push(FetchResult {
                        identifier: identifier.clone(),
                        outcome: FetchOutcome::Failed(QuoteError::Network(
                            "worker terminated".to_string(),
                        )),
                    });
                }
            }
        }

        results
    }
}

async fn run_job(ctx: &JobContext, config: &CoordinatorConfig, job: FetchJob) -> FetchResult {
    let started = Instant::now();
    let fetch = ctx
        .source
        .fetch(&job.identifier, job.start_date, config.request_timeout);

    let outcome = match tokio::time::timeout(config.request_timeout, fetch).await {
        Ok(Ok(candles)) if candles.is_empty() => FetchOutcome::NoNewData,
        Ok(Ok(candles)) => FetchOutcome::Fetched(candles),
        Ok(Err(QuoteError::Empty)) => FetchOutcome::NoNewData,
        Ok(Err(e)) => FetchOutcome::Failed(e),
        Err(_) => FetchOutcome::Failed(QuoteError::Timeout(config.request_timeout)),
    };

    match &outcome {
        FetchOutcome::Failed(e) => warn!(
            identifier = %job.identifier,
            kind = e.kind().as_str(),
            error = %e,
            "FetchCoordinator: fetch failed for {}",
            job.identifier
        ),
        FetchOutcome::NoNewData => debug!(
            identifier = %job.identifier,
            "FetchCoordinator: no new data for {}",
            job.identifier
        ),
        FetchOutcome::Fetched(candles) => debug!(
            identifier = %job.identifier,
            count = candles.len(),
            "FetchCoordinator: fetched {} candles for {}",
            candles.len(),
            job.identifier
        ),
    }

    if let Some(metrics) = &ctx.metrics {
        metrics
            .fetch_results_total
            .with_label_values(&[outcome.label()])
            .inc();
        metrics
            .fetch_duration_seconds
            .with_label_values(&[ctx.source.name()])
            .observe(started.elapsed().as_secs_f64());
    }

    FetchResult {
        identifier: job.identifier,
        outcome,
    }
}
