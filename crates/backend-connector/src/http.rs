// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Issues the real HTTP call a relayed `HttpRequestWrapper` describes
//! against the configured origin, and builds the `HttpResponseWrapper`
//! sent back over `BackendSend`.

use std::collections::HashMap;

use relay_proto::proto::{HttpHeader, HttpRequestWrapper, HttpResponseWrapper};
use reqwest::Method;
use tracing::{debug, warn};

/// Rewrite `request.http_request_url`'s scheme/host to the configured
/// origin, issue the call, and materialize the full response body.
///
/// GET requests carry no body, matching the original's `http.MethodGet`
/// special case; every other method forwards the received body as-is.
pub async fn forward(client: &reqwest::Client, origin: &str, request: &HttpRequestWrapper) -> HttpResponseWrapper {
    match forward_inner(client, origin, request).await {
        Ok(response) => response,
        Err(e) => {
            warn!(connection_id = %request.connection_id, error = %e, "origin request failed");
            HttpResponseWrapper {
                connection_id: request.connection_id.clone(),
                status: 502,
                headers: HashMap::new(),
                body: format!("backend-connector: {e}").into_bytes(),
            }
        }
    }
}

async fn forward_inner(
    client: &reqwest::Client,
    origin: &str,
    request: &HttpRequestWrapper,
) -> anyhow::Result<HttpResponseWrapper> {
    let url = rewrite_url(&request.http_request_url, origin)?;
    let method = Method::from_bytes(request.http_method.as_bytes())?;

    debug!(connection_id = %request.connection_id, %method, %url, "forwarding to origin");

    let mut builder = client.request(method.clone(), url);
    for (name, value) in relay_proto::proto_headers_to_pairs(&request.headers) {
        builder = builder.header(name, value);
    }
    if method != Method::GET {
        builder = builder.body(request.body.clone());
    }

    let response = builder.send().await?;
    let status = response.status().as_u16() as i32;

    let mut grouped: HashMap<String, Vec<String>> = HashMap::new();
    for (name, value) in response.headers().iter() {
        if let Ok(value) = value.to_str() {
            grouped.entry(name.as_str().to_owned()).or_default().push(value.to_owned());
        }
    }
    let headers: HashMap<String, HttpHeader> = relay_proto::headers_to_proto(grouped);

    let body = response.bytes().await?.to_vec();

    Ok(HttpResponseWrapper { connection_id: request.connection_id.clone(), status, headers, body })
}

/// Swap the scheme and host of `request_url` for the configured origin,
/// preserving path and query exactly.
fn rewrite_url(request_url: &str, origin: &str) -> anyhow::Result<reqwest::Url> {
    let origin = reqwest::Url::parse(origin)?;
    let mut url = reqwest::Url::parse(request_url)?;
    url.set_scheme(origin.scheme()).map_err(|_| anyhow::anyhow!("invalid scheme"))?;
    url.set_host(origin.host_str())?;
    if let Some(port) = origin.port() {
        url.set_port(Some(port)).map_err(|_| anyhow::anyhow!("invalid port"))?;
    }
    Ok(url)
}
