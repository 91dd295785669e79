//! Embeddable HTTP API for health checks, status, and monitoring
//!
//! The engine ships a router the host mounts into its own server:
//! `/health`, `/status`, `/jobs`, and `/metrics`.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tokio::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::metrics;
use crate::monitor::{JobMonitor, JobStatusRecord};
use crate::quote::{CacheStats, QuoteEngine};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub monitor: JobMonitor,
    pub quotes: Arc<QuoteEngine>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(monitor: JobMonitor, quotes: Arc<QuoteEngine>) -> Self {
        Self {
            monitor,
            quotes,
            started_at: Instant::now(),
        }
    }
}

/// Build the status router for mounting into a host server
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(get_status))
        .route("/jobs", get(get_jobs))
        .route("/metrics", get(get_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint - basic liveness
async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Engine status: uptime, in-flight jobs, quote cache effectiveness
async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    let jobs = state.monitor.active_jobs();

    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        jobs_in_flight: jobs.len(),
        quote_cache: state.quotes.cache_stats(),
    })
}

/// All currently tracked cross-ledger jobs
async fn get_jobs(State(state): State<AppState>) -> impl IntoResponse {
    let jobs = state.monitor.active_jobs();
    (StatusCode::OK, Json(JobsResponse { jobs }))
}

/// Prometheus text exposition
async fn get_metrics() -> impl IntoResponse {
    metrics::render()
}

// Response types

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Serialize)]
struct StatusResponse {
    version: String,
    uptime_seconds: u64,
    jobs_in_flight: usize,
    quote_cache: CacheStats,
}

#[derive(Serialize)]
struct JobsResponse {
    jobs: Vec<JobStatusRecord>,
}
