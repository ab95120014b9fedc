// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WS ingress queue — a single, relay-wide FIFO of pending WebSocket
//! connect requests, drained by however many backend-connectors currently
//! have a `WebSocketBackendConnecterReceive` call open.
//!
//! Unlike the domain registry, connect requests are not partitioned by
//! domain: any connector pulling from the queue may claim the next request.
//! This matches the wire contract (`WebSocketBackendConnecterReceive` takes
//! no `Connection`), so the queue is a plain multi-consumer channel rather
//! than an actor with per-domain routing.

use std::sync::Arc;

use relay_proto::proto::WebSocketConnectRequest;
use tokio::sync::{mpsc, Mutex};

const INGRESS_QUEUE_DEPTH: usize = 256;

#[derive(Clone)]
pub struct WsIngressHandle {
    tx: mpsc::Sender<WebSocketConnectRequest>,
    rx: Arc<Mutex<mpsc::Receiver<WebSocketConnectRequest>>>,
}

impl WsIngressHandle {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(INGRESS_QUEUE_DEPTH);
        Self { tx, rx: Arc::new(Mutex::new(rx)) }
    }

    /// Enqueue a connect request on behalf of `WebSocketFrontConnecter`.
    /// Returns an error if every consumer has gone away.
    pub async fn push(&self, request: WebSocketConnectRequest) -> Result<(), WebSocketConnectRequest> {
        self.tx.send(request).await.map_err(|e| e.0)
    }

    /// Pull the next pending connect request. Held by a
    /// `WebSocketBackendConnecterReceive` stream for as long as that call is
    /// open; the lock only serializes the pop itself, not the connector's
    /// subsequent dial.
    pub async fn pop(&self) -> Option<WebSocketConnectRequest> {
        self.rx.lock().await.recv().await
    }
}

impl Default for WsIngressHandle {
    fn default() -> Self {
        Self::new()
    }
}
