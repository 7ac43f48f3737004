//! Stocker API Server
//!
//! HTTP API with health check, metrics, screens, trackings and a manual
//! pipeline trigger.

use dotenvy::dotenv;
use stocker::core::http::{start_server, AppState};
use stocker::core::runtime::ServiceRuntime;
use stocker::logging;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenv().ok();
    logging::init_logging();

    let port = stocker::config::get_port();
    let env = stocker::config::get_environment();
    info!("Starting Stocker API Server");
    info!(environment = %env, "Environment");
    info!(port = port, "HTTP Server: http://0.0.0.0:{}", port);

    let runtime = ServiceRuntime::from_env().await?;
    let state = AppState::new(runtime.metrics.clone())
        .with_query(runtime.query.clone())
        .with_pipeline(runtime.pipeline.clone());

    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(port, state).await {
            error!(error = %e, "HTTP server error");
        }
    });

    info!("API server started, waiting for shutdown signal...");
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Shutting down API server...");
            info!("API server stopped");
        }
        _ = server_handle => {
            error!("HTTP server stopped");
        }
    }

    Ok(())
}
