// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-connection WebSocket frame bridge.
//!
//! Each `connection_id` owns exactly one pair of channels connecting its
//! `WebSocketFrontend` duplex stream to its `WebSocketBackend` duplex
//! stream. Unlike the original design's global shared queues, a bridge
//! here is scoped to a single connection and is torn down the moment
//! either side's stream ends, instead of outliving the session.

use std::collections::HashMap;

use relay_proto::proto::WebSocketPacket;
use tokio::sync::{mpsc, oneshot};

use crate::error::RelayError;

const BRIDGE_QUEUE_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Frontend,
    Backend,
}

impl Side {
    fn opposite(self) -> Side {
        match self {
            Side::Frontend => Side::Backend,
            Side::Backend => Side::Frontend,
        }
    }
}

/// One side's view of a bridge: a channel to push frames to the peer and a
/// channel to receive frames from it.
pub struct BridgeHalf {
    pub outbound: mpsc::Sender<WebSocketPacket>,
    pub inbound: mpsc::Receiver<WebSocketPacket>,
}

struct PendingEntry {
    waiting_for: Side,
    half_for_waiting_side: BridgeHalf,
}

enum Command {
    Claim { connection_id: String, side: Side, reply: oneshot::Sender<Result<BridgeHalf, RelayError>> },
    Abandon { connection_id: String, side: Side },
}

#[derive(Clone)]
pub struct BridgeRegistryHandle {
    tx: mpsc::Sender<Command>,
}

impl BridgeRegistryHandle {
    pub fn spawn() -> Self {
        let (tx, mut rx) = mpsc::channel::<Command>(256);

        tokio::spawn(async move {
            let mut pending: HashMap<String, PendingEntry> = HashMap::new();

            while let Some(command) = rx.recv().await {
                match command {
                    Command::Claim { connection_id, side, reply } => {
                        let result = match pending.remove(&connection_id) {
                            Some(entry) if entry.waiting_for == side => Ok(entry.half_for_waiting_side),
                            Some(entry) => {
                                // Same side claimed twice before the peer showed up;
                                // put the original entry back untouched.
                                pending.insert(connection_id.clone(), entry);
                                Err(RelayError::DuplicateConnectionId)
                            }
                            None => {
                                let (to_backend_tx, to_backend_rx) = mpsc::channel(BRIDGE_QUEUE_DEPTH);
                                let (to_frontend_tx, to_frontend_rx) = mpsc::channel(BRIDGE_QUEUE_DEPTH);

                                let (my_half, peer_half) = match side {
                                    Side::Frontend => (
                                        BridgeHalf { outbound: to_backend_tx, inbound: to_frontend_rx },
                                        BridgeHalf { outbound: to_frontend_tx, inbound: to_backend_rx },
                                    ),
                                    Side::Backend => (
                                        BridgeHalf { outbound: to_frontend_tx, inbound: to_backend_rx },
                                        BridgeHalf { outbound: to_backend_tx, inbound: to_frontend_rx },
                                    ),
                                };

                                pending.insert(
                                    connection_id.clone(),
                                    PendingEntry { waiting_for: side.opposite(), half_for_waiting_side: peer_half },
                                );
                                Ok(my_half)
                            }
                        };
                        let _ = reply.send(result);
                    }
                    Command::Abandon { connection_id, side } => {
                        if let Some(entry) = pending.get(&connection_id) {
                            if entry.waiting_for == side.opposite() {
                                pending.remove(&connection_id);
                            }
                        }
                    }
                }
            }
        });

        Self { tx }
    }

    /// Claim this connection's bridge half for `side`. The first caller for
    /// a given `connection_id` creates the bridge and waits; the second
    /// completes it.
    pub async fn claim(&self, connection_id: String, side: Side) -> Result<BridgeHalf, RelayError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let _ = self.tx.send(Command::Claim { connection_id, side, reply: reply_tx }).await;
        reply_rx.await.map_err(|_| RelayError::NoPendingWsConnect)?
    }

    /// Give up a half-open bridge, e.g. because the frontend disconnected
    /// before a backend-connector ever claimed the session.
    pub async fn abandon(&self, connection_id: String, side: Side) {
        let _ = self.tx.send(Command::Abandon { connection_id, side }).await;
    }
}
