// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Drives requests through the real `client`/`backend-connector` binaries'
//! HTTP handling, not the raw gRPC stubs, so a relative-URL or
//! domain-mismatch regression in either crate fails here.

use relay_tests::{RunningOrigin, RunningStack};

#[tokio::test]
async fn end_user_request_reaches_the_real_origin_via_host_header_routing() -> anyhow::Result<()> {
    let origin = RunningOrigin::start().await?;
    let stack = RunningStack::start("example.test", &origin.addr, None).await?;

    let response = reqwest::Client::new()
        .get(format!("http://{}/ping", stack.proxy_addr))
        .header(reqwest::header::HOST, "example.test")
        .send()
        .await?;

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.text().await?, "pong");
    Ok(())
}

/// The end user's `Host` need not match the backend-connector's registered
/// domain when the edge is pinned to that domain via `--domain`/`DOMAIN`.
#[tokio::test]
async fn client_domain_override_routes_regardless_of_host_header() -> anyhow::Result<()> {
    let origin = RunningOrigin::start().await?;
    let stack = RunningStack::start("backend.internal", &origin.addr, Some("backend.internal")).await?;

    let response = reqwest::Client::new()
        .get(format!("http://{}/ping", stack.proxy_addr))
        .header(reqwest::header::HOST, "localhost")
        .send()
        .await?;

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.text().await?, "pong");
    Ok(())
}

/// Without a client-side domain override, a `Host` that doesn't match any
/// registered backend fails with a server error rather than silently
/// routing somewhere wrong.
#[tokio::test]
async fn mismatched_host_without_override_fails() -> anyhow::Result<()> {
    let origin = RunningOrigin::start().await?;
    let stack = RunningStack::start("backend.internal", &origin.addr, None).await?;

    let response = reqwest::Client::new()
        .get(format!("http://{}/ping", stack.proxy_addr))
        .header(reqwest::header::HOST, "unregistered.example")
        .send()
        .await?;

    assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    Ok(())
}

/// A POST body survives the round trip, proving the reconstructed absolute
/// URL and the body are both wired through correctly for non-GET methods.
#[tokio::test]
async fn post_body_round_trips_through_the_real_stack() -> anyhow::Result<()> {
    let origin = RunningOrigin::start().await?;
    let stack = RunningStack::start("example.test", &origin.addr, None).await?;

    let response = reqwest::Client::new()
        .post(format!("http://{}/echo", stack.proxy_addr))
        .header(reqwest::header::HOST, "example.test")
        .body("hello from the real stack")
        .send()
        .await?;

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.text().await?, "hello from the real stack");
    Ok(())
}
