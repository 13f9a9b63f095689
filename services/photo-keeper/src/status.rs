//! Plain-text HTTP status endpoint.
//!
//! - `GET /`        stats dump, one `key value` line per stat
//! - `GET /log`     recent log lines
//! - `GET /metrics` Prometheus exposition
//! - `GET /health`  liveness
//!
//! Anything else is a 404.

use axum::{
    extract::Extension,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use keeper_common::Request;
use metrics_exporter_prometheus::PrometheusHandle;
use std::io;
use std::sync::Arc;
use storage::WorkQueue;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::logbuf::LogBuffer;
use crate::stats::Stats;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Everything the status handlers read.
#[derive(Clone)]
pub struct StatusState {
    pub stats: Arc<Stats>,
    pub queue: WorkQueue<Request>,
    pub log: LogBuffer,
    /// `None` when no Prometheus recorder is installed.
    pub prometheus: Option<PrometheusHandle>,
}

pub fn router(state: StatusState) -> Router {
    Router::new()
        .route("/", get(stats_handler))
        .route("/log", get(log_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .fallback(not_found_handler)
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
}

/// Serve the status endpoint on an already-bound listener.
pub async fn serve(listener: TcpListener, state: StatusState) -> io::Result<()> {
    axum::serve(listener, router(state)).await
}

fn text(status: StatusCode, body: String) -> Response {
    (status, [(header::CONTENT_TYPE, TEXT_PLAIN)], body).into_response()
}

/// GET / - stats dump
async fn stats_handler(Extension(state): Extension<StatusState>) -> Response {
    let snapshot = state.stats.snapshot(state.queue.len());
    text(StatusCode::OK, snapshot.render_text())
}

/// GET /log - recent log lines, oldest first
async fn log_handler(Extension(state): Extension<StatusState>) -> Response {
    text(StatusCode::OK, state.log.render_text())
}

/// GET /metrics - Prometheus metrics
async fn metrics_handler(Extension(state): Extension<StatusState>) -> Response {
    match &state.prometheus {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => text(
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics recorder not installed\n".to_string(),
        ),
    }
}

/// GET /health
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn not_found_handler() -> Response {
    text(StatusCode::NOT_FOUND, "not found\n".to_string())
}
