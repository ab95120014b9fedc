// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Proxies a single end-user HTTP request through the relay's
//! `FrontendEndpoint` unary call.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use relay_proto::proto::HttpHeader;
use tracing::warn;

use crate::state::EdgeState;

fn request_headers_to_proto(headers: &HeaderMap) -> HashMap<String, HttpHeader> {
    let mut grouped: HashMap<String, Vec<String>> = HashMap::new();
    for (name, value) in headers.iter() {
        if let Ok(value) = value.to_str() {
            grouped.entry(name.as_str().to_owned()).or_default().push(value.to_owned());
        }
    }
    relay_proto::headers_to_proto(grouped)
}

/// Absolute URL for the relay/backend-connector to act on: `uri` as axum
/// hands it to us only carries origin-form (path and query), so scheme and
/// host have to be reattached here before the wrapper leaves the edge.
fn absolute_url(scheme: &str, host: &str, uri: &axum::http::Uri) -> String {
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    format!("{scheme}://{host}{path_and_query}")
}

fn host_header(headers: &HeaderMap) -> &str {
    headers.get(axum::http::header::HOST).and_then(|v| v.to_str().ok()).unwrap_or_default()
}

pub async fn proxy(
    State(state): State<Arc<EdgeState>>,
    method: axum::http::Method,
    uri: axum::http::Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let host = host_header(&headers);
    let domain = state.config.domain.clone().unwrap_or_else(|| host.to_owned());
    let scheme = if state.config.tls_enabled { "https" } else { "http" };

    let connection_id = relay_proto::new_connection_id();
    let body = if method == axum::http::Method::GET { Vec::new() } else { body.to_vec() };

    let request = relay_proto::proto::HttpRequestWrapper {
        connection_id,
        domain,
        http_method: method.as_str().to_owned(),
        http_request_url: absolute_url(scheme, host, &uri),
        headers: request_headers_to_proto(&headers),
        body,
    };

    let mut relay = state.relay.clone();
    match relay.frontend_endpoint(request).await {
        Ok(response) => wrapper_to_response(response.into_inner()),
        Err(status) => {
            warn!(%status, "frontend_endpoint failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn wrapper_to_response(wrapper: relay_proto::proto::HttpResponseWrapper) -> Response {
    let status = StatusCode::from_u16(wrapper.status as u16).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = Response::builder().status(status);
    if let Some(response_headers) = response.headers_mut() {
        for (name, value) in relay_proto::proto_headers_to_pairs(&wrapper.headers) {
            if let (Ok(name), Ok(value)) = (HeaderName::try_from(name), HeaderValue::try_from(value)) {
                response_headers.append(name, value);
            }
        }
    }
    response.body(axum::body::Body::from(wrapper.body)).unwrap_or_else(|_| {
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    })
}
