// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end scenarios driven against an in-process relay, with stub
//! backend-connector and stub client-edge roles played directly over the
//! generated gRPC stubs.

use std::collections::HashMap;
use std::time::Duration;

use futures_util::StreamExt;
use relay_proto::proto::{
    Connection, Empty, HttpResponseWrapper, WebSocketConnectRequest, WebSocketConnectResponse, WebSocketPacket,
};
use relay_tests::{http_request, new_id, RunningRelay};
use tokio_stream::wrappers::ReceiverStream;

const WAIT: Duration = Duration::from_secs(5);

/// A single backend-connector serves a GET and the response carries the
/// same `connection_id` as the request.
#[tokio::test]
async fn s1_http_round_trip_single_backend() -> anyhow::Result<()> {
    let relay = RunningRelay::start().await?;
    let mut backend = relay.connect().await?;

    let mut requests = backend
        .backend_receive(Connection { domain: "pong.test".to_owned(), developer_name: "alice".to_owned() })
        .await?
        .into_inner();

    tokio::spawn({
        let mut backend = backend.clone();
        async move {
            while let Some(Ok(req)) = requests.next().await {
                let response = HttpResponseWrapper {
                    connection_id: req.connection_id,
                    status: 200,
                    headers: HashMap::new(),
                    body: b"pong".to_vec(),
                };
                let _ = backend.backend_send(tokio_stream::once(response)).await;
            }
        }
    });

    // Give the registration a beat to land before the frontend call races it.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut frontend = relay.connect().await?;
    let request = http_request("pong.test");
    let connection_id = request.connection_id.clone();

    let response = tokio::time::timeout(WAIT, frontend.frontend_endpoint(request)).await??.into_inner();

    assert_eq!(response.connection_id, connection_id);
    assert_eq!(response.status, 200);
    assert_eq!(response.body, b"pong");
    Ok(())
}

/// An echo backend returns exactly what it received, including
/// multi-value headers and the request body bytes.
#[tokio::test]
async fn s2_header_and_body_fidelity_on_echo() -> anyhow::Result<()> {
    let relay = RunningRelay::start().await?;
    let mut backend = relay.connect().await?;

    let mut requests = backend
        .backend_receive(Connection { domain: "echo.test".to_owned(), developer_name: "alice".to_owned() })
        .await?
        .into_inner();

    tokio::spawn({
        let mut backend = backend.clone();
        async move {
            while let Some(Ok(req)) = requests.next().await {
                let response = HttpResponseWrapper {
                    connection_id: req.connection_id,
                    status: 200,
                    headers: req.headers,
                    body: req.body,
                };
                let _ = backend.backend_send(tokio_stream::once(response)).await;
            }
        }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut frontend = relay.connect().await?;
    let mut request = http_request("echo.test");
    request.http_method = "POST".to_owned();
    request.body = b"hello".to_vec();
    request.headers = relay_proto::headers_to_proto(vec![("X-Thing", vec!["a", "b"])]);

    let response = tokio::time::timeout(WAIT, frontend.frontend_endpoint(request.clone())).await??.into_inner();

    assert_eq!(response.body, request.body);
    let mut header_values = response.headers.get("X-Thing").expect("header preserved").value.clone();
    header_values.sort();
    assert_eq!(header_values, vec!["a".to_owned(), "b".to_owned()]);
    Ok(())
}

/// A domain with no registered backend fails fast, without waiting out
/// any timeout.
#[tokio::test]
async fn s4_no_backend_for_domain_fails_fast() -> anyhow::Result<()> {
    let relay = RunningRelay::start().await?;
    let mut frontend = relay.connect().await?;

    let started = tokio::time::Instant::now();
    let err = frontend.frontend_endpoint(http_request("nowhere.test")).await.unwrap_err();
    assert!(started.elapsed() < Duration::from_millis(500), "no-backend-for-domain must not block");
    assert_eq!(err.code(), tonic::Code::NotFound);
    assert_eq!(err.message(), "no-backend-for-domain");
    Ok(())
}

/// A second `BackendReceive` registration for the same domain supersedes
/// the first, whose stream ends, and subsequent requests are served by
/// the second registrant.
#[tokio::test]
async fn s6_second_registration_supersedes_first() -> anyhow::Result<()> {
    let relay = RunningRelay::start().await?;

    let mut first_backend = relay.connect().await?;
    let mut first_requests = first_backend
        .backend_receive(Connection { domain: "dup.test".to_owned(), developer_name: "alice".to_owned() })
        .await?
        .into_inner();

    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut second_backend = relay.connect().await?;
    let mut second_requests = second_backend
        .backend_receive(Connection { domain: "dup.test".to_owned(), developer_name: "bob".to_owned() })
        .await?
        .into_inner();

    // The first registrant's stream must end (superseded) within bounded time.
    let first_outcome = tokio::time::timeout(WAIT, first_requests.next()).await?;
    match first_outcome {
        Some(Err(status)) => assert_eq!(status.code(), tonic::Code::Aborted),
        other => panic!("expected first registration to be superseded, got {other:?}"),
    }

    tokio::spawn({
        let mut second_backend = second_backend.clone();
        async move {
            while let Some(Ok(req)) = second_requests.next().await {
                let response = HttpResponseWrapper {
                    connection_id: req.connection_id,
                    status: 200,
                    headers: HashMap::new(),
                    body: b"from-bob".to_vec(),
                };
                let _ = second_backend.backend_send(tokio_stream::once(response)).await;
            }
        }
    });

    let mut frontend = relay.connect().await?;
    let response =
        tokio::time::timeout(WAIT, frontend.frontend_endpoint(http_request("dup.test"))).await??.into_inner();
    assert_eq!(response.body, b"from-bob");
    Ok(())
}

/// FIFO per domain: two requests submitted in order from a
/// single caller are received by the connector in that same order.
#[tokio::test]
async fn fifo_order_per_domain() -> anyhow::Result<()> {
    let relay = RunningRelay::start().await?;
    let mut backend = relay.connect().await?;
    let mut requests = backend
        .backend_receive(Connection { domain: "fifo.test".to_owned(), developer_name: "alice".to_owned() })
        .await?
        .into_inner();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut frontend_a = relay.connect().await?;
    let mut frontend_b = relay.connect().await?;
    let mut req_a = http_request("fifo.test");
    req_a.connection_id = "r1".to_owned();
    let mut req_b = http_request("fifo.test");
    req_b.connection_id = "r2".to_owned();

    // Fire both calls as real concurrent tasks, but ensure r1's enqueue is
    // issued first.
    let call_a = tokio::spawn(async move { frontend_a.frontend_endpoint(req_a).await });
    tokio::time::sleep(Duration::from_millis(10)).await;
    let call_b = tokio::spawn(async move { frontend_b.frontend_endpoint(req_b).await });

    let first_received = requests.next().await.expect("first request").expect("ok");
    assert_eq!(first_received.connection_id, "r1");

    // Reply to both so the pending calls don't hang the test.
    let second_received = requests.next().await.expect("second request").expect("ok");
    assert_eq!(second_received.connection_id, "r2");

    for id in ["r1", "r2"] {
        let response = HttpResponseWrapper { connection_id: id.to_owned(), status: 200, headers: HashMap::new(), body: vec![] };
        backend.backend_send(tokio_stream::once(response)).await?;
    }
    call_a.await??;
    call_b.await??;
    Ok(())
}

/// The backend's registration can go away mid-session; a request
/// enqueued afterward fails with `backend-disconnected` instead of hanging
/// forever, and the relay remains healthy for the next registrant.
#[tokio::test]
async fn s3_backend_disconnect_then_recovery() -> anyhow::Result<()> {
    let relay = RunningRelay::start_with_timeouts(Duration::from_secs(1), Duration::from_secs(5)).await?;

    {
        let mut backend = relay.connect().await?;
        let mut requests = backend
            .backend_receive(Connection { domain: "flaky.test".to_owned(), developer_name: "alice".to_owned() })
            .await?
            .into_inner();

        tokio::spawn({
            let mut backend = backend.clone();
            async move {
                if let Some(Ok(req)) = requests.next().await {
                    let response =
                        HttpResponseWrapper { connection_id: req.connection_id, status: 200, headers: HashMap::new(), body: b"ok".to_vec() };
                    let _ = backend.backend_send(tokio_stream::once(response)).await;
                }
                // Stream ends here (connector "goes away").
            }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let mut frontend = relay.connect().await?;
        let response =
            tokio::time::timeout(WAIT, frontend.frontend_endpoint(http_request("flaky.test"))).await??.into_inner();
        assert_eq!(response.status, 200);
    }

    // Backend gone: give the relay's stream-ended cleanup a moment to run,
    // then the domain has no registrant at all, so this fails fast rather
    // than waiting out backend_wait_timeout.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let mut frontend = relay.connect().await?;
    let err = frontend.frontend_endpoint(http_request("flaky.test")).await.unwrap_err();
    assert_eq!(err.code(), tonic::Code::NotFound);

    // A fresh registration recovers the domain.
    let mut backend2 = relay.connect().await?;
    let mut requests2 = backend2
        .backend_receive(Connection { domain: "flaky.test".to_owned(), developer_name: "alice".to_owned() })
        .await?
        .into_inner();
    tokio::spawn({
        let mut backend2 = backend2.clone();
        async move {
            while let Some(Ok(req)) = requests2.next().await {
                let response =
                    HttpResponseWrapper { connection_id: req.connection_id, status: 200, headers: HashMap::new(), body: b"ok".to_vec() };
                let _ = backend2.backend_send(tokio_stream::once(response)).await;
            }
        }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    let response =
        tokio::time::timeout(WAIT, frontend.frontend_endpoint(http_request("flaky.test"))).await??.into_inner();
    assert_eq!(response.status, 200);
    Ok(())
}

/// A WebSocket session bridges frames in both directions between a
/// stub client-edge role and a stub backend-connector role, preserving
/// opcode and payload.
#[tokio::test]
async fn s5_websocket_echo_round_trip() -> anyhow::Result<()> {
    let relay = RunningRelay::start().await?;

    let mut backend = relay.connect().await?;
    let mut connects = backend.web_socket_backend_connecter_receive(Empty {}).await?.into_inner();

    let mut frontend = relay.connect().await?;
    let connection_id = new_id();
    let connect_request =
        WebSocketConnectRequest { connection_id: connection_id.clone(), http_request_url: "ws://echo.test/ws".to_owned() };

    let frontend_connect = tokio::spawn({
        let mut frontend = frontend.clone();
        let connect_request = connect_request.clone();
        async move { frontend.web_socket_front_connecter(connect_request).await }
    });

    let inbound_connect = tokio::time::timeout(WAIT, connects.next()).await?.expect("connect request")?;
    assert_eq!(inbound_connect.connection_id, connection_id);

    backend
        .web_socket_backend_connecter_send(WebSocketConnectResponse {
            connection_id: connection_id.clone(),
            status: relay_proto::WS_CONNECT_SUCCESS.to_owned(),
        })
        .await?;

    let connect_response = frontend_connect.await??.into_inner();
    assert_eq!(connect_response.status, relay_proto::WS_CONNECT_SUCCESS);

    // Backend side opens its duplex half first...
    let (backend_tx, backend_rx) = tokio::sync::mpsc::channel::<WebSocketPacket>(8);
    let mut backend_request = tonic::Request::new(ReceiverStream::new(backend_rx));
    backend_request.metadata_mut().insert("x-connection-id", connection_id.parse()?);
    let mut backend_download = backend.web_socket_backend(backend_request).await?.into_inner();

    // ...then the frontend side opens its duplex half, completing the bridge.
    let (frontend_tx, frontend_rx) = tokio::sync::mpsc::channel::<WebSocketPacket>(8);
    let mut frontend_request = tonic::Request::new(ReceiverStream::new(frontend_rx));
    frontend_request.metadata_mut().insert("x-connection-id", connection_id.parse()?);
    let mut frontend_download = frontend.web_socket_frontend(frontend_request).await?.into_inner();

    // Echo task on the backend side: send back whatever it receives.
    tokio::spawn(async move {
        while let Some(Ok(packet)) = backend_download.next().await {
            if backend_tx.send(packet).await.is_err() {
                break;
            }
        }
    });

    let text_packet = WebSocketPacket {
        connection_id: connection_id.clone(),
        message_type: 1,
        data: b"ping".to_vec(),
        message_id: new_id(),
    };
    let binary_packet =
        WebSocketPacket { connection_id: connection_id.clone(), message_type: 2, data: vec![0, 1, 2], message_id: new_id() };

    frontend_tx.send(text_packet.clone()).await?;
    frontend_tx.send(binary_packet.clone()).await?;

    let echoed_text = tokio::time::timeout(WAIT, frontend_download.next()).await?.expect("echoed text")?;
    assert_eq!(echoed_text.message_type, 1);
    assert_eq!(echoed_text.data, b"ping");

    let echoed_binary = tokio::time::timeout(WAIT, frontend_download.next()).await?.expect("echoed binary")?;
    assert_eq!(echoed_binary.message_type, 2);
    assert_eq!(echoed_binary.data, vec![0, 1, 2]);

    Ok(())
}
