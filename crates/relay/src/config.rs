// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use clap::Parser;

/// Rendezvous relay for the reverse-tunnel proxy.
#[derive(Debug, Parser)]
#[command(name = "relay", version, about)]
pub struct Config {
    /// Host to bind the gRPC listener on.
    #[arg(long, env = "RELAY_SERVER_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to bind the gRPC listener on.
    #[arg(long, env = "RELAY_SERVER_PORT", default_value = "20000")]
    pub port: u16,

    /// Maximum time a request may wait in a domain's queue for a
    /// backend-connector to pull it before failing with `backend-disconnected`.
    #[arg(long, env = "RELAY_BACKEND_WAIT_TIMEOUT_SECS", default_value = "30")]
    pub backend_wait_timeout_secs: u64,

    /// Maximum time a `FrontendEndpoint` call waits for its response before
    /// the response slot is dropped and the call fails.
    #[arg(long, env = "RELAY_RESPONSE_TIMEOUT_SECS", default_value = "60")]
    pub response_timeout_secs: u64,

    /// Loopback port serving a bare liveness endpoint, separate from the
    /// gRPC listener.
    #[arg(long, env = "RELAY_HEALTH_PORT", default_value = "9090")]
    pub health_port: u16,

    /// Log format (json or text).
    #[arg(long, env = "RELAY_LOG_FORMAT", default_value = "json")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "RELAY_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Config {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn backend_wait_timeout(&self) -> Duration {
        Duration::from_secs(self.backend_wait_timeout_secs)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_secs(self.response_timeout_secs)
    }
}

/// Initialize tracing/logging from config.
///
/// Uses `try_init` so it's safe to call multiple times (e.g. from tests).
pub fn init_tracing(config: &Config) {
    use tracing_subscriber::EnvFilter;

    let filter = if std::env::var("RELAY_LOG_LEVEL").is_err() && config.log_level == "info" {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level))
    } else {
        EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let result = match config.log_format.as_str() {
        "json" => tracing_subscriber::fmt().with_env_filter(filter).json().try_init(),
        _ => tracing_subscriber::fmt().with_env_filter(filter).try_init(),
    };
    drop(result);
}
