//! HTTP endpoint server using Axum

use axum::{
    extract::{Path, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{Json, Response},
    routing::{delete, get, post},
    Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{error, info, Level};

use crate::core::pipeline::Pipeline;
use crate::core::query::ScreenQuery;
use crate::metrics::Metrics;
use crate::models::screen::{ScreenView, Tracking, TrackingView};
use crate::services::eastmoney::is_valid_secid;

pub const SERVICE_NAME: &str = "stocker";

#[derive(Clone)]
pub struct AppState {
    pub health: Arc<RwLock<HealthStatus>>,
    pub metrics: Arc<Metrics>,
    pub start_time: Arc<Instant>,
    pub query: Option<Arc<ScreenQuery>>,
    pub pipeline: Option<Arc<Pipeline>>,
}

impl AppState {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self {
            health: Arc::new(RwLock::new(HealthStatus::default())),
            metrics,
            start_time: Arc::new(Instant::now()),
            query: None,
            pipeline: None,
        }
    }

    pub fn with_query(mut self, query: Arc<ScreenQuery>) -> Self {
        self.query = Some(query);
        self
    }

    pub fn with_pipeline(mut self, pipeline: Arc<Pipeline>) -> Self {
        self.pipeline = Some(pipeline);
        self
    }
}

#[derive(Clone, Debug)]
pub struct HealthStatus {
    pub status: String,
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self {
            status: "healthy".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_seconds: u64,
    pub service: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TrackRequest {
    pub identifier: String,
    pub name: String,
    /// Defaults to today
    pub started: Option<NaiveDate>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SecurityRequest {
    pub identifier: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RunAccepted {
    pub status: String,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let health = state.health.read().await;
    Json(HealthResponse {
        status: health.status.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        service: SERVICE_NAME.to_string(),
    })
}

pub async fn metrics_handler(State(state): State<AppState>) -> Result<String, StatusCode> {
    state
        .metrics
        .export()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

/// Middleware to track HTTP request metrics
async fn metrics_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    state.metrics.http_requests_in_flight.inc();

    let response = next.run(request).await;
    let status = response.status();
    let duration = start.elapsed();

    state.metrics.http_requests_in_flight.dec();
    state.metrics.http_requests_total.inc();
    state
        .metrics
        .http_request_duration_seconds
        .observe(duration.as_secs_f64());

    if status.is_server_error() {
        error!(
            method = %method,
            path = %path,
            status = %status,
            duration_ms = duration.as_millis(),
            "HTTP request error"
        );
    }

    response
}

fn query_of(state: &AppState) -> Result<&Arc<ScreenQuery>, StatusCode> {
    state.query.as_ref().ok_or(StatusCode::SERVICE_UNAVAILABLE)
}

/// List the current screen set
async fn list_screens(State(state): State<AppState>) -> Result<Json<Vec<ScreenView>>, StatusCode> {
    let screens = query_of(&state)?.screens().await.map_err(|e| {
        error!(error = %e, "Failed to load screens");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Json(screens))
}

/// List tracked securities with their performance
async fn list_trackings(
    State(state): State<AppState>,
) -> Result<Json<Vec<TrackingView>>, StatusCode> {
    let trackings = query_of(&state)?.trackings().await.map_err(|e| {
        error!(error = %e, "Failed to load trackings");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Json(trackings))
}

/// Start tracking a security
async fn create_tracking(
    State(state): State<AppState>,
    Json(request): Json<TrackRequest>,
) -> Result<(StatusCode, Json<Tracking>), StatusCode> {
    if request.identifier.trim().is_empty() {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }

    let tracking = Tracking {
        identifier: request.identifier,
        name: request.name,
        started: request.started.unwrap_or_else(|| Utc::now().date_naive()),
    };

    let tracked = query_of(&state)?
        .track(tracking.clone())
        .await
        .map_err(|e| {
            error!(error = %e, identifier = %tracking.identifier, "Failed to create tracking");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    if !tracked {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok((StatusCode::CREATED, Json(tracking)))
}

/// Stop tracking a security
async fn delete_tracking(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> Result<StatusCode, StatusCode> {
    let removed = query_of(&state)?.untrack(&identifier).await.map_err(|e| {
        error!(error = %e, identifier = %identifier, "Failed to delete tracking");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

async fn list_securities(State(state): State<AppState>) -> Result<Json<Vec<String>>, StatusCode> {
    let securities = query_of(&state)?.securities().await.map_err(|e| {
        error!(error = %e, "Failed to load securities");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Json(securities))
}

/// Add a security to the universe; its history is fetched on the next run
async fn create_security(
    State(state): State<AppState>,
    Json(request): Json<SecurityRequest>,
) -> Result<(StatusCode, Json<SecurityRequest>), StatusCode> {
    let identifier = request.identifier.trim().to_string();
    if !is_valid_secid(&identifier) {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }

    let created = query_of(&state)?
        .register_security(&identifier)
        .await
        .map_err(|e| {
            error!(error = %e, identifier = %identifier, "Failed to register security");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    if !created {
        return Err(StatusCode::CONFLICT);
    }
    info!(identifier = %identifier, "Registered security {}", identifier);
    Ok((StatusCode::CREATED, Json(SecurityRequest { identifier })))
}

async fn delete_security(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> Result<StatusCode, StatusCode> {
    let removed = query_of(&state)?
        .unregister_security(&identifier)
        .await
        .map_err(|e| {
            error!(error = %e, identifier = %identifier, "Failed to remove security");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    if removed {
        info!(identifier = %identifier, "Removed security {}", identifier);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

/// Trigger a pipeline run in the background, 409 while one is in progress
async fn trigger_run(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<RunAccepted>), StatusCode> {
    let pipeline = state
        .pipeline
        .clone()
        .ok_or(StatusCode::SERVICE_UNAVAILABLE)?;
    let guard = pipeline.try_claim().ok_or(StatusCode::CONFLICT)?;

    tokio::spawn(async move {
        if let Err(e) = pipeline.run_claimed(guard).await {
            error!(error = %e, "Manually triggered pipeline run failed");
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(RunAccepted {
            status: "accepted".to_string(),
        }),
    ))
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .route("/api/screens", get(list_screens))
        .route("/api/trackings", get(list_trackings).post(create_tracking))
        .route("/api/trackings/{identifier}", delete(delete_tracking))
        .route("/api/securities", get(list_securities).post(create_security))
        .route("/api/securities/{identifier}", delete(delete_security))
        .route("/api/runs", post(trigger_run))
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
                        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                        .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
                )
                .layer(axum::middleware::from_fn_with_state(
                    state.clone(),
                    metrics_middleware,
                ))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

pub async fn start_server(port: u16, state: AppState) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!(port = port, "HTTP server listening on port {}", port);
    info!(
        "Metrics endpoint available at http://0.0.0.0:{}/metrics",
        port
    );
    axum::serve(listener, app).await?;

    Ok(())
}
