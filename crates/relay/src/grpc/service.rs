// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `Relay` trait implementation — all eight RPC handlers.

use futures_util::StreamExt;
use relay_proto::proto;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status};
use tracing::{info, warn};

use super::{connection_id_from_metadata, GrpcStream, RelayGrpc};
use crate::ws_bridge::{BridgeHalf, Side};

#[tonic::async_trait]
impl proto::relay_server::Relay for RelayGrpc {
    // -- HTTP path --------------------------------------------------------

    async fn frontend_endpoint(
        &self,
        request: Request<proto::HttpRequestWrapper>,
    ) -> Result<Response<proto::HttpResponseWrapper>, Status> {
        let req = request.into_inner();
        let connection_id = req.connection_id.clone();

        let slot = self.http_responses.create(connection_id.clone()).await.map_err(|e| e.to_status())?;

        let sender = match self.domains.lookup(&req.domain).await {
            Some(sender) => sender,
            None => return Err(crate::error::RelayError::NoBackendForDomain.to_status()),
        };

        match tokio::time::timeout(self.config.backend_wait_timeout(), sender.send(req)).await {
            Ok(Ok(())) => {}
            _ => return Err(crate::error::RelayError::BackendDisconnected.to_status()),
        }

        let response = slot.recv(self.config.response_timeout()).await.map_err(|e| e.to_status())?;
        Ok(Response::new(response))
    }

    type BackendReceiveStream = GrpcStream<proto::HttpRequestWrapper>;

    async fn backend_receive(
        &self,
        request: Request<proto::Connection>,
    ) -> Result<Response<Self::BackendReceiveStream>, Status> {
        let conn = request.into_inner();
        let mut registration = self.domains.register(conn.domain.clone(), conn.developer_name.clone()).await;
        let domains = self.domains.clone();
        let domain = conn.domain.clone();
        let generation = registration.generation;

        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = &mut registration.superseded => {
                        let _ = tx.send(Err(crate::error::RelayError::Superseded.to_status())).await;
                        break;
                    }
                    next = registration.request_rx.recv() => {
                        match next {
                            Some(req) => {
                                if tx.send(Ok(req)).await.is_err() {
                                    break;
                                }
                            }
                            None => break,
                        }
                    }
                }
            }
            domains.deregister_if_current(domain, generation).await;
        });

        Ok(Response::new(Box::pin(ReceiverStream::new(rx))))
    }

    async fn backend_send(
        &self,
        request: Request<tonic::Streaming<proto::HttpResponseWrapper>>,
    ) -> Result<Response<proto::BackendSendAck>, Status> {
        let mut stream = request.into_inner();
        let mut accepted = 0u32;

        while let Some(item) = stream.next().await {
            let response = item?;
            let connection_id = response.connection_id.clone();
            self.http_responses.deliver(connection_id, response).await.map_err(|e| e.to_status())?;
            accepted += 1;
        }

        Ok(Response::new(proto::BackendSendAck { accepted }))
    }

    // -- WebSocket path -----------------------------------------------------

    async fn web_socket_front_connecter(
        &self,
        request: Request<proto::WebSocketConnectRequest>,
    ) -> Result<Response<proto::WebSocketConnectResponse>, Status> {
        let req = request.into_inner();
        let connection_id = req.connection_id.clone();

        let slot = self.ws_connects.create(connection_id.clone()).await.map_err(|e| e.to_status())?;

        if self.ws_ingress.push(req).await.is_err() {
            return Err(Status::unavailable("ws ingress queue has no consumers"));
        }

        let response = slot.recv(self.config.response_timeout()).await.map_err(|e| e.to_status())?;
        Ok(Response::new(response))
    }

    type WebSocketBackendConnecterReceiveStream = GrpcStream<proto::WebSocketConnectRequest>;

    async fn web_socket_backend_connecter_receive(
        &self,
        _request: Request<proto::Empty>,
    ) -> Result<Response<Self::WebSocketBackendConnecterReceiveStream>, Status> {
        let ingress = self.ws_ingress.clone();
        let (tx, rx) = mpsc::channel(64);

        tokio::spawn(async move {
            while let Some(req) = ingress.pop().await {
                if tx.send(Ok(req)).await.is_err() {
                    break;
                }
            }
        });

        Ok(Response::new(Box::pin(ReceiverStream::new(rx))))
    }

    async fn web_socket_backend_connecter_send(
        &self,
        request: Request<proto::WebSocketConnectResponse>,
    ) -> Result<Response<proto::BackendSendAck>, Status> {
        let req = request.into_inner();
        let connection_id = req.connection_id.clone();
        self.ws_connects.deliver(connection_id, req).await.map_err(|e| e.to_status())?;
        Ok(Response::new(proto::BackendSendAck { accepted: 1 }))
    }

    type WebSocketFrontendStream = GrpcStream<proto::WebSocketPacket>;

    async fn web_socket_frontend(
        &self,
        request: Request<tonic::Streaming<proto::WebSocketPacket>>,
    ) -> Result<Response<Self::WebSocketFrontendStream>, Status> {
        let connection_id = connection_id_from_metadata(request.metadata())?;
        let half = self.ws_bridges.claim(connection_id.clone(), Side::Frontend).await.map_err(|e| e.to_status())?;
        let bridges = self.ws_bridges.clone();
        let incoming = request.into_inner();

        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(bridge_session(connection_id, Side::Frontend, half, incoming, tx, bridges));

        Ok(Response::new(Box::pin(ReceiverStream::new(rx))))
    }

    type WebSocketBackendStream = GrpcStream<proto::WebSocketPacket>;

    async fn web_socket_backend(
        &self,
        request: Request<tonic::Streaming<proto::WebSocketPacket>>,
    ) -> Result<Response<Self::WebSocketBackendStream>, Status> {
        let connection_id = connection_id_from_metadata(request.metadata())?;
        let half = self.ws_bridges.claim(connection_id.clone(), Side::Backend).await.map_err(|e| e.to_status())?;
        let bridges = self.ws_bridges.clone();
        let incoming = request.into_inner();

        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(bridge_session(connection_id, Side::Backend, half, incoming, tx, bridges));

        Ok(Response::new(Box::pin(ReceiverStream::new(rx))))
    }
}

/// Shuttle frames between one side's duplex stream and its bridge half
/// until either direction ends, then close both and forget the bridge
/// claim (a no-op if the peer already completed it).
async fn bridge_session(
    connection_id: String,
    side: Side,
    half: BridgeHalf,
    mut incoming: tonic::Streaming<proto::WebSocketPacket>,
    outgoing: mpsc::Sender<Result<proto::WebSocketPacket, Status>>,
    bridges: crate::ws_bridge::BridgeRegistryHandle,
) {
    let BridgeHalf { outbound, mut inbound } = half;

    let upload = async {
        while let Some(item) = incoming.next().await {
            match item {
                Ok(packet) => {
                    if outbound.send(packet).await.is_err() {
                        break;
                    }
                }
                Err(status) => {
                    warn!(connection_id = %connection_id, side = ?side, %status, "ws stream read error");
                    break;
                }
            }
        }
    };

    let download = async {
        while let Some(packet) = inbound.recv().await {
            if outgoing.send(Ok(packet)).await.is_err() {
                break;
            }
        }
    };

    tokio::select! {
        () = upload => {},
        () = download => {},
    }

    info!(connection_id = %connection_id, side = ?side, "ws bridge session ended");
    bridges.abandon(connection_id, side).await;
}
