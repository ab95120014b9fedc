// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::Config;
use crate::grpc::RelayGrpc;

/// Run the relay until `shutdown` is cancelled.
pub async fn run(config: Config, shutdown: CancellationToken) -> anyhow::Result<()> {
    let addr = config.addr().parse()?;
    let health_port = config.health_port;
    let config = Arc::new(config);
    let service = RelayGrpc::new(Arc::clone(&config));

    info!(%addr, health_port, "relay listening");

    let grpc_shutdown = shutdown.clone();
    let grpc = service.into_router().serve_with_shutdown(addr, async move { grpc_shutdown.cancelled().await });
    let health = crate::health::serve(health_port, shutdown);

    let (grpc_result, health_result) = tokio::join!(grpc, health);
    grpc_result?;
    health_result?;

    Ok(())
}
