// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::http::{HeaderMap, Method, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::state::EdgeState;
use crate::{health, http, relay_conn, ws};

/// Dispatches every inbound request: a `WebSocketUpgrade` extraction
/// succeeding means the request carries `Upgrade: websocket`, matching it
/// against the WS bridge; otherwise it is proxied as a plain HTTP request.
async fn edge_handler(
    state: State<Arc<EdgeState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    ws_upgrade: Option<WebSocketUpgrade>,
    body: Bytes,
) -> Response {
    match ws_upgrade {
        Some(ws_upgrade) => ws::upgrade(state, uri, headers, ws_upgrade).await.into_response(),
        None => http::proxy(state, method, uri, headers, body).await,
    }
}

fn router(state: Arc<EdgeState>) -> Router {
    Router::new()
        .route("/{*path}", any(edge_handler))
        .route("/", any(edge_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the edge until `shutdown` is cancelled.
pub async fn run(config: Config, shutdown: CancellationToken) -> anyhow::Result<()> {
    config.validate().map_err(anyhow::Error::msg)?;

    let relay = relay_conn::connect(&config.relay_addr()).await?;
    let addr = config.proxy_addr();
    let state = Arc::new(EdgeState { relay, config: config.clone() });
    let app = router(state);

    let health_server = health::serve(config.health_port, shutdown.clone());

    let edge_server = async {
        let handle = axum_server::Handle::new();
        let handle_for_shutdown = handle.clone();
        let edge_shutdown = shutdown.clone();
        tokio::spawn(async move {
            edge_shutdown.cancelled().await;
            handle_for_shutdown.graceful_shutdown(None);
        });

        if config.tls_enabled {
            let cert = config.ssl_cert_file_name.as_deref().unwrap_or_default();
            let key = config.ssl_cert_key_file_name.as_deref().unwrap_or_default();
            let tls_config = RustlsConfig::from_pem_file(cert, key).await?;
            info!(%addr, "edge listening (tls)");
            axum_server::bind_rustls(addr, tls_config).handle(handle).serve(app.into_make_service()).await?;
        } else {
            info!(%addr, "edge listening");
            axum_server::bind(addr).handle(handle).serve(app.into_make_service()).await?;
        }
        Ok::<(), anyhow::Error>(())
    };

    let (edge_result, health_result) = tokio::join!(edge_server, health_server);
    edge_result?;
    health_result?;

    Ok(())
}
