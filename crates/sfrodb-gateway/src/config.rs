//! Gateway configuration.

use std::time::Duration;

use sfrodb_client::ClientConfig;

/// How the gateway's HTTP listener is served.
#[derive(Debug, Clone)]
pub enum ListenMode {
    /// Plain HTTP.
    Http,
    /// HTTPS, terminated by this process using the given PEM files.
    Https {
        /// Path to a PEM certificate chain.
        cert_path: String,
        /// Path to a PEM private key.
        key_path: String,
    },
}

/// Everything needed to stand up the gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Host the HTTP listener binds to.
    pub host: String,
    /// Port the HTTP listener binds to.
    pub port: u16,
    /// Plain HTTP or HTTPS.
    pub mode: ListenMode,

    /// Connection settings for clients in the backing pool.
    pub client: ClientConfig,
    /// Number of pooled clients.
    pub pool_size: usize,

    /// `Content-Type` applied to every successful response.
    pub mime_type: String,
    /// `max-age`, in seconds, for the `Cache-Control` header.
    pub cache_max_age_sec: u64,
    /// `Access-Control-Allow-Origin` value; omitted entirely if `None`.
    pub cors_origin: Option<String>,

    /// How many times to retry acquiring a pooled client before giving up.
    pub acquire_retry_attempts: u32,
    /// Delay between acquire retries.
    pub acquire_retry_interval: Duration,

    /// Consecutive server-class errors after which the gateway cancels
    /// its shutdown token and exits. `0` disables this (never exit).
    pub max_consecutive_server_errors: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            mode: ListenMode::Http,
            client: ClientConfig::default(),
            pool_size: 4,
            mime_type: "application/octet-stream".into(),
            cache_max_age_sec: 3600,
            cors_origin: None,
            acquire_retry_attempts: 600,
            acquire_retry_interval: Duration::from_millis(100),
            max_consecutive_server_errors: 0,
        }
    }
}

impl GatewayConfig {
    /// The address the listener binds to.
    #[must_use]
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
