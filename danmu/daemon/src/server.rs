//! Caption HTTP Server
//!
//! Serves resolved caption sets to overlays:
//!
//! | Path | Description |
//! |------|-------------|
//! | `GET /api/danmu` | Captions for `source`, `id`, `title`, `provider`, `from`, `to`, `limit` |
//! | `GET /healthz` | Liveness probe |
//!
//! No authentication is enforced. Every request succeeds: upstream failures are
//! absorbed by the aggregator and answered with the fallback set.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::{debug, info};

use danmu_core::{CaptionAggregator, CaptionItem, CaptionRequest};

/// Shared state passed to all request handlers
#[derive(Clone)]
pub struct AppState {
    aggregator: Arc<CaptionAggregator>,
    default_provider: String,
    default_limit: usize,
}

impl AppState {
    /// Create handler state
    pub fn new(
        aggregator: Arc<CaptionAggregator>,
        default_provider: impl Into<String>,
        default_limit: usize,
    ) -> Self {
        Self {
            aggregator,
            default_provider: default_provider.into(),
            default_limit,
        }
    }
}

/// Body of `GET /api/danmu`
#[derive(Debug, Serialize)]
pub struct CaptionsResponse {
    /// Resolved captions
    pub items: Vec<CaptionItem>,
}

/// Body of `GET /healthz`
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"`
    pub status: &'static str,
    /// Server cache entries, stale ones included
    pub cached_entries: usize,
    /// Whether an upstream aggregator is configured
    pub upstream: bool,
}

/// Build the router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/danmu", get(get_captions))
        .route("/healthz", get(health))
        .with_state(state)
}

/// Bind `addr` and serve until `shutdown` resolves
pub async fn serve<F>(addr: &str, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind caption server to {addr}"))?;
    let local = listener
        .local_addr()
        .context("Failed to read bound address")?;
    info!(addr = %local, "Caption server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("Caption server failed")?;

    info!("Caption server stopped");
    Ok(())
}

async fn get_captions(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<CaptionsResponse> {
    let request =
        CaptionRequest::from_params(&params, &state.default_provider, state.default_limit);
    let items = state.aggregator.resolve(&request).await;
    debug!(
        provider = %request.query.provider,
        source = %request.query.source,
        id = %request.query.id,
        count = items.len(),
        "Served captions"
    );
    Json(CaptionsResponse { items })
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        cached_entries: state.aggregator.cache().len(),
        upstream: state.aggregator.has_upstream(),
    })
}
