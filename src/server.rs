//! HTTP surface.
//!
//! | Route | Response |
//! |-------|----------|
//! | `GET /api/news` | runs one cycle; [`CycleReport`] or 500 `{error, message}` |
//! | `GET /api/analyses` | previously analyzed files, or 500 `{error, message}` |
//! | `GET /api/health` | [`HealthReport`]; 200 when healthy, 503 otherwise |

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::api::{AnalysisClient, HealthReport};
use crate::cycle::{CycleReport, NewsCycle};
use crate::retry::Backoff;

/// Shared state behind every route.
#[derive(Debug)]
pub struct AppState {
    pub cycle: NewsCycle,
    pub client: AnalysisClient,
    pub backoff: Backoff,
}

/// Body of every failed request.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

fn failure(error: &'static str, message: impl ToString) -> Response {
    let body = ErrorBody {
        error,
        message: message.to_string(),
    };
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/news", get(news))
        .route("/api/analyses", get(analyses))
        .route("/api/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Bind `addr` and serve until the process stops.
pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Listening");
    axum::serve(listener, router(state)).await
}

async fn news(State(state): State<Arc<AppState>>) -> Response {
    match state.cycle.run(&state.client).await {
        Ok(report) => Json::<CycleReport>(report).into_response(),
        Err(e) => {
            error!(error = %e, category = ?e.last.category(), "News cycle failed");
            failure("Analysis failed", e.into_last())
        }
    }
}

async fn analyses(State(state): State<Arc<AppState>>) -> Response {
    let backoff = state.backoff;
    match state
        .client
        .previously_analyzed_with_retry(backoff.max_attempts, backoff.initial_delay)
        .await
    {
        Ok(files) => Json(files).into_response(),
        Err(e) => {
            error!(error = %e, category = ?e.last.category(), "Fetching analysis history failed");
            failure("Fetching analyses failed", e.into_last())
        }
    }
}

async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthReport>) {
    let report = state.client.health_check().await;
    let status = if report.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}
