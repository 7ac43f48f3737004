//! Cron-based scheduler for pipeline runs

use crate::core::pipeline::Pipeline;
use cron::Schedule;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

/// Scheduler that runs the pipeline on every cron tick
pub struct JobScheduler {
    pipeline: Arc<Pipeline>,
    schedule: Schedule,
    handle: Arc<RwLock<Option<tokio::task::JoinHandle<()>>>>,
}

impl JobScheduler {
    /// Create a new scheduler
    ///
    /// # Arguments
    /// * `pipeline` - Pipeline executed on every tick
    /// * `cron_expr` - Six-field cron expression (seconds first), evaluated in UTC
    pub fn new(
        pipeline: Arc<Pipeline>,
        cron_expr: &str,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let schedule = Schedule::from_str(cron_expr).map_err(|e| {
            Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Invalid cron expression '{}': {}", cron_expr, e),
            )) as Box<dyn std::error::Error + Send + Sync>
        })?;

        info!(cron = %cron_expr, "JobScheduler: created with cron '{}'", cron_expr);

        Ok(Self {
            pipeline,
            schedule,
            handle: Arc::new(RwLock::new(None)),
        })
    }

    /// Next time the pipeline will run
    pub fn next_tick(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.schedule.upcoming(chrono::Utc).next()
    }

    /// Start the scheduler
    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let pipeline = self.pipeline.clone();
        let schedule = self.schedule.clone();

        let handle = tokio::spawn(async move {
            info!("JobScheduler: started, waiting for cron schedule...");

            loop {
                let mut upcoming = schedule.upcoming(chrono::Utc);
                if let Some(next_tick) = upcoming.next() {
                    let now = chrono::Utc::now();
                    if next_tick > now {
                        let duration = (next_tick - now).to_std().unwrap_or_default();
                        tokio::time::sleep(duration).await;
                    }
                } else {
                    tokio::time::sleep(tokio::time::Duration::from_secs(60)).await;
                    continue;
                }

                info!("JobScheduler: cron tick, running pipeline");

                // awaited so runs never overlap
                if let Err(e) = pipeline.run().await {
                    error!(error = %e, "JobScheduler: pipeline run failed");
                }
            }
        });

        {
            let mut h = self.handle.write().await;
            if let Some(previous) = h.replace(handle) {
                previous.abort();
            }
        }

        info!("JobScheduler: started successfully");
        Ok(())
    }

    /// Stop the scheduler
    pub async fn stop(&self) {
        let mut handle = self.handle.write().await;
        if let Some(h) = handle.take() {
            h.abort();
            info!("JobScheduler: stopped");
        }
    }

    /// Check if the scheduler is running
    pub async fn is_running(&self) -> bool {
        let handle = self.handle.read().await;
        handle.is_some()
    }
}
