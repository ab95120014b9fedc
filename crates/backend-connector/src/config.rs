// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;

/// Outbound-only tunnel agent: registers a domain with the relay and
/// forwards relayed traffic to a real local backend.
#[derive(Debug, Clone, Parser)]
#[command(name = "backend-connector", version, about)]
pub struct Config {
    /// Relay host to dial.
    #[arg(long, env = "RELAY_SERVER_HOST", default_value = "127.0.0.1")]
    pub relay_server_host: String,

    /// Relay port to dial.
    #[arg(long, env = "RELAY_SERVER_PORT", default_value = "20000")]
    pub relay_server_port: u16,

    /// `host:port` of the real backend this connector forwards to.
    #[arg(long, env = "BACKEND_HOST_NAME")]
    pub backend_host_name: String,

    /// Scheme used to reach the real backend.
    #[arg(long, env = "BACKEND_SCHEME", default_value = "http")]
    pub backend_scheme: String,

    /// Developer name reported on registration.
    #[arg(long, env = "DEVELOPER_NAME")]
    pub developer_name: String,

    /// Public-facing domain to register with the relay. Defaults to
    /// `backend_host_name`, matching the source's behavior of using the
    /// backend's own address as the routing key.
    #[arg(long, env = "DOMAIN")]
    pub domain: Option<String>,

    /// Keep retrying `BackendReceive` with exponential backoff if the relay
    /// connection drops or a registration is superseded, instead of exiting.
    #[arg(long, env = "BACKEND_RECONNECT", default_value_t = false)]
    pub reconnect: bool,

    /// Loopback port serving a bare liveness endpoint (this process has no
    /// other inbound listener).
    #[arg(long, env = "BACKEND_HEALTH_PORT", default_value = "9092")]
    pub health_port: u16,

    /// Log format (json or text).
    #[arg(long, env = "BACKEND_LOG_FORMAT", default_value = "json")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "BACKEND_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Config {
    pub fn relay_addr(&self) -> String {
        format!("{}:{}", self.relay_server_host, self.relay_server_port)
    }

    pub fn domain(&self) -> String {
        self.domain.clone().unwrap_or_else(|| self.backend_host_name.clone())
    }

    pub fn http_origin(&self) -> String {
        format!("{}://{}", self.backend_scheme, self.backend_host_name)
    }

    pub fn ws_origin(&self) -> String {
        let ws_scheme = if self.backend_scheme == "https" { "wss" } else { "ws" };
        format!("{ws_scheme}://{}", self.backend_host_name)
    }
}

/// Initialize tracing/logging from config.
pub fn init_tracing(config: &Config) {
    use tracing_subscriber::EnvFilter;

    let filter = if std::env::var("BACKEND_LOG_LEVEL").is_err() && config.log_level == "info" {
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
