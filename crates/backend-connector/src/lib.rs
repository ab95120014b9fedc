// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound-only tunnel agent: registers a domain with the relay, issues
//! real HTTP/WebSocket calls against a local backend on its behalf, and
//! streams the results back over the relay's gRPC surface.

pub mod config;
mod health;
mod http;
mod relay_conn;
pub mod server;
mod ws;
