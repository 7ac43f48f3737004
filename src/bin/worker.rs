//! Stocker Worker
//!
//! Runs the ingestion pipeline on its cron schedule. Set `RUN_ONCE=1` to run
//! a single pipeline pass and exit.

use dotenvy::dotenv;
use std::env;
use stocker::core::runtime::ServiceRuntime;
use stocker::core::scheduler::JobScheduler;
use stocker::logging;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenv().ok();
    logging::init_logging();

    let env = stocker::config::get_environment();
    info!("Starting Stocker Worker");
    info!(environment = %env, "Environment");

    let runtime = ServiceRuntime::from_env().await?;

    let run_once = env::var("RUN_ONCE")
        .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
        .unwrap_or(false);

    if run_once {
        info!("RUN_ONCE set, running pipeline a single time");
        let report = runtime.pipeline.run().await?;
        info!(summary = %report.summary(), "Pipeline finished");
        return Ok(());
    }

    let scheduler = JobScheduler::new(runtime.pipeline.clone(), &runtime.config.cron)?;
    if let Some(next) = scheduler.next_tick() {
        info!(next = %next, "Next pipeline run at {}", next);
    }
    scheduler.start().await?;

    info!("Worker started, waiting for shutdown signal...");
    if let Err(e) = signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }

    info!("Shutting down worker...");
    scheduler.stop().await;
    info!("Worker stopped");

    Ok(())
}
