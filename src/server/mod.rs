//! HTTP trigger surface.
//!
//! Two routes: `GET /` reports liveness, `GET /agent/run` executes one
//! monitoring pass and returns its outcomes as JSON. Runs are serialized
//! behind an async mutex so overlapping triggers cannot interleave IMAP
//! traffic or store writes.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use crate::alert::AlertSink;
use crate::providers::mail::MailSource;
use crate::services::{MonitorError, MonitorService, RunReport};
use crate::store::ProcessedIdStore;

/// Service name reported by the liveness route.
const SERVICE_NAME: &str = "Autonomous Phishing Email Analyzer & Reporter";

/// Errors surfaced to HTTP clients.
pub enum AppError {
    Internal(MonitorError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            AppError::Internal(e) => {
                tracing::error!(error = %e, "agent run failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(serde_json::json!({ "error": msg }))).into_response()
    }
}

impl From<MonitorError> for AppError {
    fn from(e: MonitorError) -> Self {
        AppError::Internal(e)
    }
}

/// Shared handler state: the monitor plus a guard serializing runs.
pub struct AppState<M, A, S> {
    monitor: MonitorService<M, A, S>,
    run_guard: Mutex<()>,
}

impl<M, A, S> AppState<M, A, S> {
    pub fn new(monitor: MonitorService<M, A, S>) -> Self {
        Self {
            monitor,
            run_guard: Mutex::new(()),
        }
    }
}

/// Builds the application router.
pub fn router<M, A, S>(state: Arc<AppState<M, A, S>>) -> Router
where
    M: MailSource + 'static,
    A: AlertSink + 'static,
    S: ProcessedIdStore + 'static,
{
    Router::new()
        .route("/", get(home))
        .route("/agent/run", get(run_agent::<M, A, S>))
        .with_state(state)
}

/// Binds the listener and serves the router until shutdown.
pub async fn serve<M, A, S>(addr: &str, state: Arc<AppState<M, A, S>>) -> anyhow::Result<()>
where
    M: MailSource + 'static,
    A: AlertSink + 'static,
    S: ProcessedIdStore + 'static,
{
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "HTTP server listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn home() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "running",
        "service": SERVICE_NAME,
    }))
}

async fn run_agent<M, A, S>(
    State(state): State<Arc<AppState<M, A, S>>>,
) -> Result<Response, AppError>
where
    M: MailSource + 'static,
    A: AlertSink + 'static,
    S: ProcessedIdStore + 'static,
{
    let _guard = state.run_guard.lock().await;
    let report = state.monitor.run_once().await?;

    // Idle runs answer with a status object; completed runs answer with
    // the bare outcome array.
    let body = match report {
        RunReport::Idle => serde_json::json!({
            "status": "idle",
            "message": "No new unseen emails to process.",
            "results": [],
        }),
        RunReport::Completed(outcomes) => serde_json::json!(outcomes),
    };
    Ok(Json(body).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn home_reports_running() {
        let Json(body) = home().await;
        assert_eq!(body["status"], "running");
        assert_eq!(body["service"], SERVICE_NAME);
    }
}
