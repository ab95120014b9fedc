// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket bridge: splits one end-user duplex socket into the two
//! unidirectional RPC streams the relay's `WebSocketFrontend` call expects.

use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::{HeaderMap, Uri};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use relay_proto::proto::{WebSocketConnectRequest, WebSocketPacket};
use relay_proto::WsOpcode;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use crate::state::EdgeState;

pub async fn upgrade(
    State(state): State<Arc<EdgeState>>,
    uri: Uri,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(state, uri, headers, socket))
}

async fn handle_connection(state: Arc<EdgeState>, uri: Uri, headers: HeaderMap, socket: WebSocket) {
    let connection_id = relay_proto::new_connection_id();

    let host = headers.get(axum::http::header::HOST).and_then(|v| v.to_str().ok()).unwrap_or_default();
    let scheme = if state.config.tls_enabled { "wss" } else { "ws" };
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let http_request_url = format!("{scheme}://{host}{path_and_query}");

    let mut relay = state.relay.clone();
    let connect_request = WebSocketConnectRequest { connection_id: connection_id.clone(), http_request_url };

    let connect_response = match relay.web_socket_front_connecter(connect_request).await {
        Ok(response) => response.into_inner(),
        Err(status) => {
            warn!(%status, "web_socket_front_connecter failed");
            return;
        }
    };

    if connect_response.connection_id != connection_id || connect_response.status != relay_proto::WS_CONNECT_SUCCESS
    {
        warn!(connection_id = %connection_id, status = %connect_response.status, "ws connect rejected");
        return;
    }

    let (upload_tx, upload_rx) = mpsc::channel::<WebSocketPacket>(64);
    let mut request = tonic::Request::new(ReceiverStream::new(upload_rx));
    let metadata_value = match connection_id.parse() {
        Ok(value) => value,
        Err(_) => return,
    };
    request.metadata_mut().insert("x-connection-id", metadata_value);

    let mut download = match relay.web_socket_frontend(request).await {
        Ok(response) => response.into_inner(),
        Err(status) => {
            warn!(%status, "web_socket_frontend failed");
            return;
        }
    };

    let (mut ws_tx, mut ws_rx) = socket.split();

    let upload = async {
        while let Some(Ok(message)) = ws_rx.next().await {
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
                        if ws_tx.send(message).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
                Err(status) => {
                    warn!(%status, "ws download stream error");
                    break;
                }
            }
        }
    };

    tokio::select! {
        () = upload => {},
        () = download => {},
    }

    info!(connection_id = %connection_id, "ws session ended");
}

fn message_to_packet(connection_id: &str, message: Message) -> Option<WebSocketPacket> {
    let (opcode, data) = match message {
        Message::Text(text) => (WsOpcode::Text, text.as_bytes().to_vec()),
        Message::Binary(data) => (WsOpcode::Binary, data.to_vec()),
        Message::Ping(data) => (WsOpcode::Ping, data.to_vec()),
        Message::Pong(data) => (WsOpcode::Pong, data.to_vec()),
        Message::Close(frame) => (WsOpcode::Close, encode_close_frame(frame)),
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
            let mut data = frame.code.to_be_bytes().to_vec();
            data.extend_from_slice(frame.reason.as_bytes());
            data
        }
        None => Vec::new(),
    }
}

fn decode_close_frame(data: &[u8]) -> Option<CloseFrame> {
    if data.len() < 2 {
        return None;
    }
    let code = u16::from_be_bytes([data[0], data[1]]);
    let reason = String::from_utf8_lossy(&data[2..]).into_owned();
    Some(CloseFrame { code, reason: reason.into() })
}
