// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use futures_util::StreamExt;
use relay_proto::proto::Connection;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::relay_conn::{self, RelayConn};
use crate::{health, http, ws};

/// Initial backoff before retrying a dropped registration, when
/// `--reconnect` is enabled.
const RECONNECT_INITIAL: Duration = Duration::from_secs(1);
/// Maximum backoff between reconnect attempts.
const RECONNECT_MAX: Duration = Duration::from_secs(30);

/// Run the backend-connector until `shutdown` is cancelled.
///
/// Drives three concurrent loops for the lifetime of the process: the
/// `BackendReceive` request loop, the `WebSocketBackendConnecterReceive`
/// connect loop, and a bare health endpoint.
pub async fn run(config: Config, shutdown: CancellationToken) -> anyhow::Result<()> {
    let relay = relay_conn::connect(&config.relay_addr()).await?;
    info!(relay = %config.relay_addr(), domain = %config.domain(), "connected to relay");

    let http_client = reqwest::Client::builder().build().unwrap_or_default();

    let http_loop = run_http_loop(relay.clone(), http_client, config.clone(), shutdown.clone());
    let ws_loop = run_ws_loop(relay, config.clone(), shutdown.clone());
    let health_server = health::serve(config.health_port, shutdown.clone());

    let (http_result, ws_result, health_result) = tokio::join!(http_loop, ws_loop, health_server);
    http_result?;
    ws_result?;
    health_result?;

    Ok(())
}

/// Register the configured domain and forward every relayed request to the
/// real origin until the stream ends, retrying with backoff if
/// `config.reconnect` is set.
async fn run_http_loop(
    relay: RelayConn,
    http_client: reqwest::Client,
    config: Config,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let mut backoff = RECONNECT_INITIAL;

    loop {
        if shutdown.is_cancelled() {
            return Ok(());
        }

        match register_and_serve(relay.clone(), &http_client, &config, &shutdown).await {
            Ok(()) => return Ok(()),
            Err(e) if config.reconnect => {
                warn!(error = %e, "backend-receive stream ended, reconnecting");
            }
            Err(e) => return Err(e),
        }

        tokio::select! {
            () = tokio::time::sleep(backoff) => {}
            () = shutdown.cancelled() => return Ok(()),
        }
        backoff = (backoff * 2).min(RECONNECT_MAX);
    }
}

async fn register_and_serve(
    mut relay: RelayConn,
    http_client: &reqwest::Client,
    config: &Config,
    shutdown: &CancellationToken,
) -> anyhow::Result<()> {
    let conn = Connection { domain: config.domain(), developer_name: config.developer_name.clone() };
    let mut stream = relay.backend_receive(conn).await?.into_inner();
    let origin = config.http_origin();

    loop {
        tokio::select! {
            () = shutdown.cancelled() => return Ok(()),
            next = stream.next() => {
                match next {
                    Some(Ok(request)) => {
                        let relay = relay.clone();
                        let http_client = http_client.clone();
                        let origin = origin.clone();
                        tokio::spawn(async move {
                            handle_request(relay, &http_client, &origin, request).await;
                        });
                    }
                    Some(Err(status)) => {
                        anyhow::bail!("backend_receive stream error: {status}");
                    }
                    None => return Ok(()),
                }
            }
        }
    }
}

async fn handle_request(
    mut relay: RelayConn,
    http_client: &reqwest::Client,
    origin: &str,
    request: relay_proto::proto::HttpRequestWrapper,
) {
    let connection_id = request.connection_id.clone();
    let response = http::forward(http_client, origin, &request).await;

    // A fresh client-streaming call per response; a single long-lived send
    // stream keyed by connection id would also be valid, just more code.
    let outbound = tokio_stream::once(response);
    if let Err(status) = relay.backend_send(outbound).await {
        warn!(%connection_id, %status, "backend_send failed");
    }
}

/// Drain `WebSocketBackendConnecterReceive` forever, dialing the real
/// origin and bridging frames for each connect request, retrying with
/// backoff if `config.reconnect` is set.
async fn run_ws_loop(relay: RelayConn, config: Config, shutdown: CancellationToken) -> anyhow::Result<()> {
    let mut backoff = RECONNECT_INITIAL;

    loop {
        if shutdown.is_cancelled() {
            return Ok(());
        }

        match drain_ws_ingress(relay.clone(), &config, &shutdown).await {
            Ok(()) => return Ok(()),
            Err(e) if config.reconnect => {
                warn!(error = %e, "ws ingress stream ended, reconnecting");
            }
            Err(e) => {
                error!(error = %e, "ws ingress stream ended fatally");
                return Ok(());
            }
        }

        tokio::select! {
            () = tokio::time::sleep(backoff) => {}
            () = shutdown.cancelled() => return Ok(()),
        }
        backoff = (backoff * 2).min(RECONNECT_MAX);
    }
}

async fn drain_ws_ingress(mut relay: RelayConn, config: &Config, shutdown: &CancellationToken) -> anyhow::Result<()> {
    let mut stream = relay.web_socket_backend_connecter_receive(relay_proto::proto::Empty {}).await?.into_inner();
    let ws_origin = config.ws_origin();

    loop {
        tokio::select! {
            () = shutdown.cancelled() => return Ok(()),
            next = stream.next() => {
                match next {
                    Some(Ok(request)) => {
                        let relay = relay.clone();
                        let ws_origin = ws_origin.clone();
                        tokio::spawn(async move {
                            ws::handle_connect(relay, &ws_origin, request).await;
                        });
                    }
                    Some(Err(status)) => anyhow::bail!("ws ingress stream error: {status}"),
                    None => return Ok(()),
                }
            }
        }
    }
}
