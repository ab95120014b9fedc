//! Generated protobuf/gRPC types for the `relay.v1.Relay` service, shared by
//! the relay, client, and backend-connector binaries.

/// Generated protobuf types and the `tonic` client/server stubs for the
/// `relay.v1` package.
pub mod proto {
    tonic::include_proto!("relay.v1");
}

use uuid::Uuid;

/// Typed WebSocket opcode, mirroring the `int32` wire field
/// [`proto::WebSocketPacket::message_type`] one-to-one.
///
/// Kept as a Rust enum at process boundaries (relay bridge routing, client
/// and backend-connector frame translation) for exhaustiveness; the wire
/// format keeps the raw `int32` for interop simplicity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WsOpcode {
    Text,
    Binary,
    Close,
    Ping,
    Pong,
}

impl WsOpcode {
    pub fn from_wire(value: i32) -> Option<Self> {
        match value {
            1 => Some(Self::Text),
            2 => Some(Self::Binary),
            8 => Some(Self::Close),
            9 => Some(Self::Ping),
            10 => Some(Self::Pong),
            _ => None,
        }
    }

    pub fn to_wire(self) -> i32 {
        match self {
            Self::Text => 1,
            Self::Binary => 2,
            Self::Close => 8,
            Self::Ping => 9,
            Self::Pong => 10,
        }
    }
}

/// Status string used on a successful [`proto::WebSocketConnectResponse`].
pub const WS_CONNECT_SUCCESS: &str = "Success";

/// Mint a fresh connection id for a new HTTP request or WebSocket session.
pub fn new_connection_id() -> String {
    Uuid::new_v4().to_string()
}

/// Mint a fresh message id for a single WebSocket frame.
pub fn new_message_id() -> String {
    Uuid::new_v4().to_string()
}

/// Build a [`proto::HttpHeader`] map from an iterator of `(name, values)` pairs.
///
/// Header names are preserved as given; callers that need case-insensitive
/// lookup should normalize before calling this (the relay and backend-connector
/// lower-case on ingestion, matching typical HTTP header folding).
pub fn headers_to_proto<I, K, V>(pairs: I) -> std::collections::HashMap<String, proto::HttpHeader>
where
    I: IntoIterator<Item = (K, Vec<V>)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(key, values)| {
            let key = key.into();
            let header =
                proto::HttpHeader { key: key.clone(), value: values.into_iter().map(Into::into).collect() };
            (key, header)
        })
        .collect()
}

/// Flatten a proto header map back into `(name, value)` pairs, one pair per
/// value, in no particular cross-key order (multi-value order within a key
/// is preserved).
pub fn proto_headers_to_pairs(
    headers: &std::collections::HashMap<String, proto::HttpHeader>,
) -> Vec<(String, String)> {
    headers
        .values()
        .flat_map(|header| header.value.iter().map(move |value| (header.key.clone(), value.clone())))
        .collect()
}
