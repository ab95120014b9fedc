// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-session WebSocket bridge between the relay's `WebSocketBackend`
//! duplex stream and the real origin socket.
//!
//! Mirrors the client edge's `ws.rs`: one dial, one duplex RPC call, two
//! joined tasks per session, both directions closed on either failure.

use futures_util::{SinkExt, StreamExt};
use relay_proto::proto::{WebSocketConnectRequest, WebSocketConnectResponse, WebSocketPacket};
use relay_proto::WsOpcode;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tracing::{info, warn};

use crate::relay_conn::RelayConn;

/// Dial the real origin WebSocket for `request`, report success/failure
/// to the relay, and — on success — bridge frames until either side ends.
pub async fn handle_connect(mut relay: RelayConn, ws_origin: &str, request: WebSocketConnectRequest) {
    let connection_id = request.connection_id.clone();

    let url = match rewrite_url(&request.http_request_url, ws_origin) {
        Ok(url) => url,
        Err(e) => {
            warn!(%connection_id, error = %e, "invalid ws connect url");
            report(&mut relay, &connection_id, format!("Error: {e}")).await;
            return;
        }
    };

    let origin_socket = match tokio_tungstenite::connect_async(url.as_str()).await {
        Ok((socket, _)) => socket,
        Err(e) => {
            warn!(%connection_id, error = %e, "origin ws dial failed");
            report(&mut relay, &connection_id, format!("Error: {e}")).await;
            return;
        }
    };

    if !report(&mut relay, &connection_id, relay_proto::WS_CONNECT_SUCCESS.to_owned()).await {
        drop(origin_socket);
        return;
    }

    bridge(relay, connection_id, origin_socket).await;
}

/// Report a `WebSocketConnectResponse` to the relay. Returns whether the
/// report itself succeeded (a failed report means the front-connect side
/// already gave up, so the caller should tear the dial back down).
async fn report(relay: &mut RelayConn, connection_id: &str, status: String) -> bool {
    let response = WebSocketConnectResponse { connection_id: connection_id.to_owned(), status };
    relay.web_socket_backend_connecter_send(response).await.is_ok()
}

async fn bridge(
    mut relay: RelayConn,
    connection_id: String,
    origin_socket: tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
) {
    let (upload_tx, upload_rx) = mpsc::channel::<WebSocketPacket>(64);
    let mut request = tonic::Request::new(ReceiverStream::new(upload_rx));
    let metadata_value = match connection_id.parse() {
        Ok(value) => value,
        Err(_) => return,
    };
    request.metadata_mut().insert("x-connection-id", metadata_value);

    let mut download = match relay.web_socket_backend(request).await {
        Ok(response) => response.into_inner(),
        Err(status) => {
            warn!(%connection_id, %status, "web_socket_backend failed");
            return;
        }
    };

    let (mut origin_tx, mut origin_rx) = origin_socket.split();

    let upload = async {
        while let Some(Ok(message)) = origin_rx.next().await {
            match message_to_packet(&connection_id, message) {
                Some(packet) => {
                    if upload_tx.send(packet).await.is_err() {
                        break;
                    }
                }
                None => break,
            }
        }
    };

    let download = async {
        while let Some(item) = download.next().await {
            match item {
                Ok(packet) => match packet_to_message(packet) {
                    Some(message) => {
                        if origin_tx.send(message).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
                Err(status) => {
                    warn!(%connection_id, %status, "ws download stream error");
                    break;
                }
            }
        }
    };

    tokio::select! {
        () = upload => {},
        () = download => {},
    }

    info!(%connection_id, "origin ws session ended");
}

fn rewrite_url(request_url: &str, ws_origin: &str) -> anyhow::Result<reqwest::Url> {
    let origin = reqwest::Url::parse(ws_origin)?;
    let mut url = reqwest::Url::parse(request_url)?;
    url.set_scheme(origin.scheme()).map_err(|_| anyhow::anyhow!("invalid scheme"))?;
    url.set_host(origin.host_str())?;
    if let Some(port) = origin.port() {
        url.set_port(Some(port)).map_err(|_| anyhow::anyhow!("invalid port"))?;
    }
    Ok(url)
}

fn message_to_packet(connection_id: &str, message: Message) -> Option<WebSocketPacket> {
    let (opcode, data) = match message {
        Message::Text(text) => (WsOpcode::Text, text.as_bytes().to_vec()),
        Message::Binary(data) => (WsOpcode::Binary, data.to_vec()),
        Message::Ping(data) => (WsOpcode::Ping, data.to_vec()),
        Message::Pong(data) => (WsOpcode::Pong, data.to_vec()),
        Message::Close(frame) => (WsOpcode::Close, encode_close_frame(frame)),
        Message::Frame(_) => return None,
    };
    Some(WebSocketPacket {
        connection_id: connection_id.to_owned(),
        message_type: opcode.to_wire(),
        data,
        message_id: relay_proto::new_message_id(),
    })
}

fn packet_to_message(packet: WebSocketPacket) -> Option<Message> {
    let opcode = WsOpcode::from_wire(packet.message_type)?;
    Some(match opcode {
        WsOpcode::Text => Message::Text(String::from_utf8_lossy(&packet.data).into_owned().into()),
        WsOpcode::Binary => Message::Binary(packet.data.into()),
        WsOpcode::Ping => Message::Ping(packet.data.into()),
        WsOpcode::Pong => Message::Pong(packet.data.into()),
        WsOpcode::Close => Message::Close(decode_close_frame(&packet.data)),
    })
}

fn encode_close_frame(frame: Option<CloseFrame>) -> Vec<u8> {
    match frame {
        Some(frame) => {
            let mut data = u16::from(frame.code).to_be_bytes().to_vec();
            data.extend_from_slice(frame.reason.as_bytes());
            data
        }
        None => Vec::new(),
    }
}

fn decode_close_frame(data: &[u8]) -> Option<CloseFrame<'static>> {
    if data.len() < 2 {
        return None;
    }
    let code = u16::from_be_bytes([data[0], data[1]]);
    let reason = String::from_utf8_lossy(&data[2..]).into_owned();
    Some(CloseFrame { code: code.into(), reason: reason.into() })
}
