// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-use rendezvous slots keyed by connection id.
//!
//! One actor task owns the `connection_id -> slot` map; every other task
//! talks to it only through [`RendezvousHandle`]'s channel-based API, never
//! through a shared lock. The same actor shape backs both the HTTP response
//! table (`HttpResponseWrapper`) and the WebSocket connect-reply table
//! (`WebSocketConnectResponse`).

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use crate::error::RelayError;

enum Command<T> {
    Create { connection_id: String, reply: oneshot::Sender<Result<oneshot::Receiver<T>, RelayError>> },
    Deliver { connection_id: String, value: T, reply: oneshot::Sender<Result<(), RelayError>> },
    Remove { connection_id: String },
}

/// Handle to a running rendezvous actor. Cheap to clone; all clones share
/// the same underlying map.
#[derive(Clone)]
pub struct RendezvousHandle<T> {
    tx: mpsc::Sender<Command<T>>,
}

impl<T: Send + 'static> RendezvousHandle<T> {
    /// Spawn a new rendezvous actor and return a handle to it.
    pub fn spawn() -> Self {
        let (tx, mut rx) = mpsc::channel::<Command<T>>(256);

        tokio::spawn(async move {
            let mut slots: HashMap<String, oneshot::Sender<T>> = HashMap::new();

            while let Some(command) = rx.recv().await {
                match command {
                    Command::Create { connection_id, reply } => {
                        let result = if slots.contains_key(&connection_id) {
                            Err(RelayError::DuplicateConnectionId)
                        } else {
                            let (slot_tx, slot_rx) = oneshot::channel();
                            slots.insert(connection_id, slot_tx);
                            Ok(slot_rx)
                        };
                        let _ = reply.send(result);
                    }
                    Command::Deliver { connection_id, value, reply } => {
                        let result = match slots.remove(&connection_id) {
                            Some(slot_tx) => {
                                if slot_tx.send(value).is_err() {
                                    warn!(connection_id, "dropping response for abandoned slot");
                                }
                                Ok(())
                            }
                            None => Err(RelayError::NoPendingRequest),
                        };
                        let _ = reply.send(result);
                    }
                    Command::Remove { connection_id } => {
                        slots.remove(&connection_id);
                    }
                }
            }
        });

        Self { tx }
    }

    /// Allocate a fresh slot for `connection_id`. Fails with
    /// [`RelayError::DuplicateConnectionId`] if one already exists.
    pub async fn create(&self, connection_id: String) -> Result<SlotGuard<T>, RelayError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let _ = self
            .tx
            .send(Command::Create { connection_id: connection_id.clone(), reply: reply_tx })
            .await;
        let slot_rx = reply_rx.await.map_err(|_| RelayError::NoPendingRequest)??;
        Ok(SlotGuard { connection_id, receiver: Some(slot_rx), cleanup: self.tx.clone() })
    }

    /// Deliver `value` into the slot for `connection_id`. Fails with
    /// [`RelayError::NoPendingRequest`] (routing-error variant reused for
    /// both HTTP responses and WS connect replies) if no slot exists.
    pub async fn deliver(&self, connection_id: String, value: T) -> Result<(), RelayError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let _ = self.tx.send(Command::Deliver { connection_id, value, reply: reply_tx }).await;
        reply_rx.await.map_err(|_| RelayError::NoPendingRequest)?
    }
}

/// RAII guard around a slot's receiving half.
///
/// Removes the slot from the rendezvous map on drop unless the value has
/// already been taken, so a cancelled or timed-out caller never leaves a
/// stale entry behind.
pub struct SlotGuard<T> {
    connection_id: String,
    receiver: Option<oneshot::Receiver<T>>,
    cleanup: mpsc::Sender<Command<T>>,
}

impl<T> SlotGuard<T> {
    /// Await the value delivered into this slot, up to `timeout`.
    ///
    /// Consumes the guard, so this can only ever be called once per slot.
    pub async fn recv(mut self, timeout: std::time::Duration) -> Result<T, RelayError> {
        let receiver = match self.receiver.take() {
            Some(receiver) => receiver,
            // `recv` takes `self` by value, so this branch can only be
            // reached if `SlotGuard` grows a second caller of `take`.
            None => unreachable!("SlotGuard::recv consumes its only receiver"),
        };
        match tokio::time::timeout(timeout, receiver).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(RelayError::NoPendingRequest),
            Err(_) => Err(RelayError::ResponseTimedOut),
        }
    }
}

impl<T> Drop for SlotGuard<T> {
    fn drop(&mut self) {
        let _ = self.cleanup.try_send(Command::Remove { connection_id: std::mem::take(&mut self.connection_id) });
    }
}
