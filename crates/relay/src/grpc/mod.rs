// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! gRPC transport implementing the `relay.v1.Relay` service.

mod service;

use std::pin::Pin;
use std::sync::Arc;

use relay_proto::proto;
use tonic::Status;

use crate::config::Config;
use crate::domain_registry::DomainRegistryHandle;
use crate::rendezvous::RendezvousHandle;
use crate::ws_bridge::BridgeRegistryHandle;
use crate::ws_ingress::WsIngressHandle;

/// gRPC implementation of the `relay.v1.Relay` service.
pub struct RelayGrpc {
    config: Arc<Config>,
    domains: DomainRegistryHandle,
    http_responses: RendezvousHandle<proto::HttpResponseWrapper>,
    ws_connects: RendezvousHandle<proto::WebSocketConnectResponse>,
    ws_ingress: WsIngressHandle,
    ws_bridges: BridgeRegistryHandle,
}

impl RelayGrpc {
    /// Spawn all relay-internal actors and build the service.
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            domains: DomainRegistryHandle::spawn(),
            http_responses: RendezvousHandle::spawn(),
            ws_connects: RendezvousHandle::spawn(),
            ws_ingress: WsIngressHandle::new(),
            ws_bridges: BridgeRegistryHandle::spawn(),
        }
    }

    /// Build a [`tonic`] router for this service.
    pub fn into_router(self) -> tonic::transport::server::Router {
        tonic::transport::Server::builder().add_service(proto::relay_server::RelayServer::new(self))
    }
}

/// Read the `x-connection-id` metadata header a duplex stream call is
/// scoped to.
fn connection_id_from_metadata(metadata: &tonic::metadata::MetadataMap) -> Result<String, Status> {
    metadata
        .get("x-connection-id")
        .ok_or_else(|| Status::invalid_argument("missing x-connection-id metadata"))?
        .to_str()
        .map(str::to_owned)
        .map_err(|_| Status::invalid_argument("x-connection-id metadata is not valid ASCII"))
}

type GrpcStream<T> = Pin<Box<dyn tokio_stream::Stream<Item = Result<T, Status>> + Send + 'static>>;
