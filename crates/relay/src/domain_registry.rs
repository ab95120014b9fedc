// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Domain registry — maps a domain to the single-consumer request queue
//! owned by whichever backend-connector most recently registered it.
//!
//! One actor task owns the `domain -> queue` map. Lookups and registrations
//! go through the actor (cheap, never block on I/O); the actual request
//! delivery happens directly between caller and connector over a channel
//! handed out by the actor, so a slow or absent consumer on one domain
//! never blocks registry traffic for any other domain.

use std::collections::HashMap;

use relay_proto::proto::HttpRequestWrapper;
use tokio::sync::{mpsc, oneshot};
use tracing::info;

/// Queue depth for a domain's request channel. Kept at 1 to match the
/// unbuffered-channel backpressure of the original implementation: a
/// `FrontendEndpoint` enqueue only completes once the connector's
/// `BackendReceive` loop is actually ready to receive it.
const REQUEST_QUEUE_DEPTH: usize = 1;

enum Command {
    Register {
        domain: String,
        developer_name: String,
        reply: oneshot::Sender<RegistrationHandle>,
    },
    Lookup {
        domain: String,
        reply: oneshot::Sender<Option<mpsc::Sender<HttpRequestWrapper>>>,
    },
    DeregisterIfCurrent {
        domain: String,
        generation: u64,
    },
}

struct Entry {
    generation: u64,
    request_tx: mpsc::Sender<HttpRequestWrapper>,
    supersede_tx: oneshot::Sender<()>,
}

/// Returned to a freshly-registered backend-connector.
pub struct RegistrationHandle {
    pub generation: u64,
    pub request_rx: mpsc::Receiver<HttpRequestWrapper>,
    pub superseded: oneshot::Receiver<()>,
}

#[derive(Clone)]
pub struct DomainRegistryHandle {
    tx: mpsc::Sender<Command>,
}

impl DomainRegistryHandle {
    pub fn spawn() -> Self {
        let (tx, mut rx) = mpsc::channel::<Command>(256);

        tokio::spawn(async move {
            let mut domains: HashMap<String, Entry> = HashMap::new();
            let mut next_generation: u64 = 0;

            while let Some(command) = rx.recv().await {
                match command {
                    Command::Register { domain, developer_name, reply } => {
                        next_generation += 1;
                        let generation = next_generation;
                        let (request_tx, request_rx) = mpsc::channel(REQUEST_QUEUE_DEPTH);
                        let (supersede_tx, superseded) = oneshot::channel();

                        if let Some(previous) = domains.insert(
                            domain.clone(),
                            Entry { generation, request_tx, supersede_tx },
                        ) {
                            info!(domain = %domain, "superseding previous registration");
                            let _ = previous.supersede_tx.send(());
                        }

                        info!(domain = %domain, developer_name = %developer_name, "backend-connector registered");
                        let _ = reply.send(RegistrationHandle { generation, request_rx, superseded });
                    }
                    Command::Lookup { domain, reply } => {
                        let sender = domains.get(&domain).map(|entry| entry.request_tx.clone());
                        let _ = reply.send(sender);
                    }
                    Command::DeregisterIfCurrent { domain, generation } => {
                        if let std::collections::hash_map::Entry::Occupied(occupied) =
                            domains.entry(domain.clone())
                        {
                            if occupied.get().generation == generation {
                                occupied.remove();
                                info!(domain = %domain, "domain registration removed");
                            }
                        }
                    }
                }
            }
        });

        Self { tx }
    }

    /// Register (or supersede) `domain`'s request queue.
    pub async fn register(&self, domain: String, developer_name: String) -> RegistrationHandle {
        let (reply_tx, reply_rx) = oneshot::channel();
        let _ = self.tx.send(Command::Register { domain, developer_name, reply: reply_tx }).await;
        // The actor never stops while `self.tx` lives, so this cannot fail
        // in practice; an empty handle degrades to "no backend ever comes",
        // which the caller's queue-wait timeout already covers.
        reply_rx.await.unwrap_or_else(|_| RegistrationHandle {
            generation: 0,
            request_rx: mpsc::channel(1).1,
            superseded: oneshot::channel().1,
        })
    }

    /// Look up the currently registered request sender for `domain`, if any.
    pub async fn lookup(&self, domain: &str) -> Option<mpsc::Sender<HttpRequestWrapper>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let _ = self.tx.send(Command::Lookup { domain: domain.to_owned(), reply: reply_tx }).await;
        reply_rx.await.ok().flatten()
    }

    /// Remove `domain`'s registration, but only if `generation` is still the
    /// current holder (a newer registration must not be clobbered).
    pub async fn deregister_if_current(&self, domain: String, generation: u64) {
        let _ = self.tx.send(Command::DeregisterIfCurrent { domain, generation }).await;
    }
}
