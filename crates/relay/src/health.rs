// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bare liveness endpoint, separate from the gRPC listener so a load
//! balancer or orchestrator can probe the relay without speaking gRPC.

use axum::routing::get;
use axum::Router;
use tokio_util::sync::CancellationToken;

async fn healthz() -> &'static str {
    "ok"
}

pub fn router() -> Router {
    Router::new().route("/healthz", get(healthz))
}

pub async fn serve(port: u16, shutdown: CancellationToken) -> anyhow::Result<()> {
    let addr = format!("127.0.0.1:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router()).with_graceful_shutdown(async move { shutdown.cancelled().await }).await?;
    Ok(())
}
