// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::error;

use relay::config::{init_tracing, Config};

#[tokio::main]
async fn main() {
    let config = Config::parse();
    init_tracing(&config);

    let shutdown = CancellationToken::new();
    let shutdown_signal = shutdown.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        shutdown_signal.cancel();
    });

    if let Err(e) = relay::server::run(config, shutdown).await {
        error!("fatal: {e:#}");
        std::process::exit(1);
    }
}
