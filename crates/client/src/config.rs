// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;

/// Public HTTP/WebSocket edge for the reverse-tunnel proxy.
#[derive(Debug, Clone, Parser)]
#[command(name = "client", version, about)]
pub struct Config {
    /// Relay host to dial.
    #[arg(long, env = "RELAY_SERVER_HOST", default_value = "127.0.0.1")]
    pub relay_server_host: String,

    /// Relay port to dial.
    #[arg(long, env = "RELAY_SERVER_PORT", default_value = "20000")]
    pub relay_server_port: u16,

    /// Port the edge listens on for end-user HTTP(S) traffic.
    #[arg(long, env = "PROXY_PORT", default_value = "8080")]
    pub proxy_port: u16,

    /// Enable TLS termination at the edge.
    #[arg(long, env = "PROXY_TLS_ENABLED", default_value_t = false)]
    pub tls_enabled: bool,

    /// Routing domain to register every inbound request under. Defaults to
    /// each request's `Host` header, which is correct for an edge fronting
    /// several tunnels at once; set this when the edge is dedicated to a
    /// single backend-connector whose registered domain differs from the
    /// `Host` end users actually send (e.g. a bare `curl localhost:$PROXY_PORT`
    /// against a connector registered under a different domain).
    #[arg(long, env = "DOMAIN")]
    pub domain: Option<String>,

    /// PEM certificate file, required when `tls_enabled`.
    #[arg(long, env = "SSL_CERT_FILE_NAME")]
    pub ssl_cert_file_name: Option<String>,

    /// PEM private key file, required when `tls_enabled`.
    #[arg(long, env = "SSL_CERT_KEY_FILE_NAME")]
    pub ssl_cert_key_file_name: Option<String>,

    /// Loopback port serving a bare liveness endpoint.
    #[arg(long, env = "CLIENT_HEALTH_PORT", default_value = "9091")]
    pub health_port: u16,

    /// Log format (json or text).
    #[arg(long, env = "CLIENT_LOG_FORMAT", default_value = "json")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "CLIENT_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Config {
    pub fn relay_addr(&self) -> String {
        format!("{}:{}", self.relay_server_host, self.relay_server_port)
    }

    pub fn proxy_addr(&self) -> std::net::SocketAddr {
        std::net::SocketAddr::from(([0, 0, 0, 0], self.proxy_port))
    }

    /// Validate that TLS file paths are present when TLS is enabled.
    pub fn validate(&self) -> Result<(), String> {
        if self.tls_enabled && (self.ssl_cert_file_name.is_none() || self.ssl_cert_key_file_name.is_none()) {
            return Err("--ssl-cert-file-name and --ssl-cert-key-file-name are required when TLS is enabled".to_owned());
        }
        Ok(())
    }
}

/// Initialize tracing/logging from config.
pub fn init_tracing(config: &Config) {
    use tracing_subscriber::EnvFilter;

    let filter = if std::env::var("CLIENT_LOG_LEVEL").is_err() && config.log_level == "info" {
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
