//! Plain HTTP status surface.
//!
//! ## Endpoints
//!
//! - `GET /status` - formatted summary text
//! - `GET /api/snapshot` - latest snapshot as JSON
//! - `GET /api/active` - `{"active": bool}`

use std::net::SocketAddr;

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::context::AppContext;
use crate::core::models::Snapshot;

#[derive(Serialize)]
struct ActiveResponse {
    active: bool,
}

pub fn router(ctx: AppContext) -> Router {
    Router::new()
        .route("/status", get(status_text))
        .route("/api/snapshot", get(snapshot_json))
        .route("/api/active", get(active_json))
        .with_state(ctx)
}

/// Serve the status routes on `addr` until `shutdown` is cancelled.
pub async fn serve(
    ctx: AppContext,
    addr: SocketAddr,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "HTTP status endpoint listening");

    axum::serve(listener, router(ctx))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    Ok(())
}

async fn status_text(State(ctx): State<AppContext>) -> String {
    ctx.monitor.format_summary().await
}

async fn snapshot_json(State(ctx): State<AppContext>) -> Json<Snapshot> {
    Json(Snapshot::clone(&*ctx.monitor.snapshot().await))
}

async fn active_json(State(ctx): State<AppContext>) -> Json<ActiveResponse> {
    Json(ActiveResponse {
        active: ctx.monitor.has_active_jobs().await,
    })
}
